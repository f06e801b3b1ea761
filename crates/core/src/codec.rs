//! Fixed-width word encoding for assets, swap configuration and swap ids.
//!
//! Layouts (most significant bits first):
//!
//! | word     | bits 96..256  | bits 64..96 | bits 56..64 | bits 0..56 |
//! |----------|---------------|-------------|-------------|------------|
//! | asset    | contract      | amount or id (96 bits)                 ||
//! | config   | allowed       | expiry      | aux a       | aux b      |
//! | swap id  | owner         | sequence (96 bits)                     ||

use crate::domain::{LightAsset, SwapConfig, SwapId};
use crate::{Error, Result};
use ethers::types::{Address, U256};
use std::str::FromStr;
use tracing::debug;

/// Largest amount or token id representable in an asset word (2^96 - 1)
pub const MAX_AMOUNT_OR_ID: U256 = U256([u64::MAX, 0xFFFF_FFFF, 0, 0]);

/// Largest sequence number representable in a swap id (2^96 - 1)
pub const MAX_SEQUENCE: u128 = (1u128 << 96) - 1;

/// Largest expiry representable in a config word (2^32 - 1)
pub const MAX_EXPIRY: u64 = u32::MAX as u64;

/// Largest value of the 56-bit auxiliary config field
pub const MAX_AUX_B: u64 = (1u64 << 56) - 1;

const LOW_BITS: u32 = 96;
const EXPIRY_SHIFT: u32 = 64;
const AUX_A_SHIFT: u32 = 56;

/// Widens an account identifier into the low 160 bits of a word
pub fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}

/// Truncates a word to its low 160 bits as an account identifier
pub fn word_to_address(word: U256) -> Address {
    let mut buf = [0u8; 32];
    word.to_big_endian(&mut buf);
    Address::from_slice(&buf[12..])
}

/// Packs a contract and an amount or token id into one asset word
pub fn encode_asset(contract: Address, amount_or_id: U256) -> Result<LightAsset> {
    if amount_or_id > MAX_AMOUNT_OR_ID {
        return Err(Error::AmountOutOfRange(format!(
            "{} exceeds the 96-bit ceiling",
            amount_or_id
        )));
    }

    Ok(LightAsset((address_to_word(contract) << LOW_BITS) | amount_or_id))
}

/// Splits an asset word into its contract and amount or token id
pub fn decode_asset(word: U256) -> (Address, U256) {
    (word_to_address(word >> LOW_BITS), word & MAX_AMOUNT_OR_ID)
}

/// Packs a swap configuration into one word.
///
/// `expiry` must fit in 32 bits and be strictly after `now`.
pub fn encode_config(
    allowed: Address,
    expiry: u64,
    aux_a: u8,
    aux_b: u64,
    now: u64,
) -> Result<U256> {
    if expiry > MAX_EXPIRY {
        return Err(Error::ExpiryTooLarge(expiry));
    }
    if expiry <= now {
        return Err(Error::ExpiryInThePast { expiry, now });
    }
    if aux_b > MAX_AUX_B {
        return Err(Error::AuxOutOfRange(aux_b));
    }

    Ok((address_to_word(allowed) << LOW_BITS)
        | (U256::from(expiry) << EXPIRY_SHIFT)
        | (U256::from(aux_a) << AUX_A_SHIFT)
        | U256::from(aux_b))
}

/// Unpacks a configuration word
pub fn decode_config(word: U256) -> SwapConfig {
    SwapConfig {
        allowed: word_to_address(word >> LOW_BITS),
        expiry: ((word >> EXPIRY_SHIFT) & U256::from(MAX_EXPIRY)).low_u64(),
        aux_a: ((word >> AUX_A_SHIFT) & U256::from(u8::MAX)).low_u64() as u8,
        aux_b: (word & U256::from(MAX_AUX_B)).low_u64(),
    }
}

/// Derives the identifier of the `sequence`-th swap, created by `owner`
pub fn derive_swap_id(owner: Address, sequence: u128) -> Result<SwapId> {
    if sequence > MAX_SEQUENCE {
        return Err(Error::SequenceOutOfRange(sequence));
    }

    Ok(SwapId((address_to_word(owner) << LOW_BITS) | U256::from(sequence)))
}

/// Recovers `(owner, sequence)` from a swap identifier
pub fn decode_swap_id(id: SwapId) -> (Address, u128) {
    (word_to_address(id.0 >> LOW_BITS), (id.0 & MAX_AMOUNT_OR_ID).as_u128())
}

/// Parses a hex account identifier, with or without the `0x` prefix
pub fn parse_address(input: &str) -> Result<Address> {
    let trimmed = input.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if hex.len() != 40 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidAddress(input.to_string()));
    }

    Address::from_str(hex).map_err(|_| Error::InvalidAddress(input.to_string()))
}

/// Parses a decimal or `0x` hex amount and checks it fits in 96 bits
pub fn parse_amount(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    if trimmed.starts_with('-') {
        return Err(Error::AmountOutOfRange(format!(
            "{} is negative",
            trimmed
        )));
    }

    let parsed = match trimmed.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_dec_str(trimmed).ok(),
    };
    let amount = parsed
        .ok_or_else(|| Error::AmountOutOfRange(format!("{} is not a number", trimmed)))?;

    if amount > MAX_AMOUNT_OR_ID {
        return Err(Error::AmountOutOfRange(format!(
            "{} exceeds the 96-bit ceiling",
            trimmed
        )));
    }
    Ok(amount)
}

/// Builds an asset word from textual contract and amount
pub fn make_asset(contract: &str, amount_or_id: &str) -> Result<LightAsset> {
    let contract = parse_address(contract)?;
    let amount_or_id = parse_amount(amount_or_id)?;
    debug!(
        "Encoding asset: contract={:?}, amount_or_id={}",
        contract, amount_or_id
    );
    encode_asset(contract, amount_or_id)
}

/// Encodes parallel lists of contracts and amounts into asset words
pub fn compose_assets(contracts: &[Address], amounts_or_ids: &[U256]) -> Result<Vec<LightAsset>> {
    if contracts.len() != amounts_or_ids.len() {
        return Err(Error::InvalidAssetsLength(format!(
            "{} contracts for {} amounts",
            contracts.len(),
            amounts_or_ids.len()
        )));
    }

    contracts
        .iter()
        .zip(amounts_or_ids)
        .map(|(contract, amount)| encode_asset(*contract, *amount))
        .collect()
}
