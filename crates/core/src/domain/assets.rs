use serde::{Deserialize, Serialize};
use ethers::types::{Address, U256};
use crate::codec::{self, MAX_AMOUNT_OR_ID};
use crate::{Error, Result};

/// One unit of exchange in its explicit (heavy) form
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "RawAsset")]
pub struct Asset {
    /// Asset contract address
    pub contract: Address,

    /// Fungible quantity or non-fungible token id (at most 96 bits)
    pub amount_or_id: U256,
}

#[derive(Deserialize)]
struct RawAsset {
    contract: Address,
    amount_or_id: U256,
}

impl TryFrom<RawAsset> for Asset {
    type Error = Error;

    fn try_from(raw: RawAsset) -> Result<Self> {
        Asset::new(raw.contract, raw.amount_or_id)
    }
}

/// One unit of exchange packed into a single word: `contract << 96 | amount_or_id`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct LightAsset(pub U256);

impl Asset {
    /// Creates an asset, rejecting amounts wider than 96 bits
    pub fn new(contract: Address, amount_or_id: U256) -> Result<Self> {
        if amount_or_id > MAX_AMOUNT_OR_ID {
            return Err(Error::AmountOutOfRange(format!(
                "{} exceeds the 96-bit ceiling",
                amount_or_id
            )));
        }

        Ok(Self {
            contract,
            amount_or_id,
        })
    }

    /// Packs this asset into its light form
    pub fn to_light(&self) -> Result<LightAsset> {
        codec::encode_asset(self.contract, self.amount_or_id)
    }
}

impl LightAsset {
    /// Encodes a contract and amount or id
    pub fn new(contract: Address, amount_or_id: U256) -> Result<Self> {
        codec::encode_asset(contract, amount_or_id)
    }

    /// Asset contract address (high 160 bits)
    pub fn contract(&self) -> Address {
        codec::decode_asset(self.0).0
    }

    /// Amount or token id (low 96 bits)
    pub fn amount_or_id(&self) -> U256 {
        codec::decode_asset(self.0).1
    }

    /// Unpacks into the explicit form
    pub fn decode(&self) -> Asset {
        let (contract, amount_or_id) = codec::decode_asset(self.0);
        Asset {
            contract,
            amount_or_id,
        }
    }
}

impl From<LightAsset> for Asset {
    fn from(asset: LightAsset) -> Self {
        asset.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_rejects_wide_amount() {
        let contract = Address::from_low_u64_be(1);
        assert!(Asset::new(contract, MAX_AMOUNT_OR_ID).is_ok());
        assert!(Asset::new(contract, MAX_AMOUNT_OR_ID + 1).is_err());
    }

    #[test]
    fn test_light_asset_accessors() {
        let contract = Address::from_low_u64_be(0x20);
        let light = LightAsset::new(contract, U256::from(1000)).unwrap();

        assert_eq!(light.contract(), contract);
        assert_eq!(light.amount_or_id(), U256::from(1000));
        assert_eq!(Asset::from(light), Asset::new(contract, U256::from(1000)).unwrap());
    }

    #[test]
    fn test_heavy_to_light() {
        let asset = Asset::new(Address::from_low_u64_be(0x721), U256::from(11)).unwrap();
        let light = asset.to_light().unwrap();
        assert_eq!(light.decode(), asset);
    }

    #[test]
    fn test_asset_deserialize_checks_width() {
        let asset = Asset::new(Address::from_low_u64_be(0x20), U256::from(1000)).unwrap();
        let json = serde_json::to_string(&asset).expect("serialize");
        assert_eq!(serde_json::from_str::<Asset>(&json).expect("deserialize"), asset);

        let wide = format!(
            r#"{{"contract":"{:?}","amount_or_id":"0x{:x}"}}"#,
            Address::from_low_u64_be(0x20),
            U256::one() << 100
        );
        let err = serde_json::from_str::<Asset>(&wide).unwrap_err();
        assert!(err.to_string().contains("96-bit ceiling"));
    }

    #[test]
    fn test_light_asset_serde_is_a_bare_word() {
        let light = LightAsset::new(Address::from_low_u64_be(1), U256::from(2)).unwrap();
        let json = serde_json::to_string(&light).expect("serialize");
        let back: LightAsset = serde_json::from_str(&json).expect("deserialize");
        assert!(json.starts_with("\"0x"));
        assert_eq!(back, light);
    }
}
