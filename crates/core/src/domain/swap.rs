use serde::{Deserialize, Serialize};
use ethers::types::{Address, U256};
use std::fmt;
use super::assets::{Asset, LightAsset};
use crate::codec::{self, MAX_AMOUNT_OR_ID, MAX_AUX_B};
use crate::{Error, Result};

/// Swap identifier: `owner << 96 | sequence`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SwapId(pub U256);

impl SwapId {
    /// Creator encoded in the identifier
    pub fn owner(&self) -> Address {
        codec::decode_swap_id(*self).0
    }

    /// Global sequence number encoded in the identifier
    pub fn sequence(&self) -> u128 {
        codec::decode_swap_id(*self).1
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Decoded swap configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwapConfig {
    /// Only account allowed to accept; zero means anyone
    pub allowed: Address,

    /// Unix timestamp from which the swap can no longer be accepted
    pub expiry: u64,

    /// Reserved 8-bit field, carried verbatim
    pub aux_a: u8,

    /// Reserved 56-bit field, carried verbatim
    pub aux_b: u64,
}

impl SwapConfig {
    /// Creates a configuration with empty reserved fields
    pub fn new(allowed: Address, expiry: u64) -> Self {
        Self {
            allowed,
            expiry,
            aux_a: 0,
            aux_b: 0,
        }
    }

    /// Whether any account may accept
    pub fn is_public(&self) -> bool {
        self.allowed.is_zero()
    }

    /// Whether `caller` may accept
    pub fn allows(&self, caller: Address) -> bool {
        self.is_public() || self.allowed == caller
    }

    /// Whether the swap is past its expiry at `now`
    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiry
    }

    /// Checks the invariants a new swap must satisfy at `now`
    pub fn validate(&self, now: u64) -> Result<()> {
        if self.expiry <= now {
            return Err(Error::ExpiryInThePast {
                expiry: self.expiry,
                now,
            });
        }
        if self.aux_b > MAX_AUX_B {
            return Err(Error::AuxOutOfRange(self.aux_b));
        }
        Ok(())
    }

    /// Packs into a config word
    pub fn encode(&self, now: u64) -> Result<U256> {
        codec::encode_config(self.allowed, self.expiry, self.aux_a, self.aux_b, now)
    }
}

/// Asset lists of a swap, in one of the two supported representations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SwapAssets {
    /// Packed assets with separate biding and asking lists
    Light {
        biding: Vec<LightAsset>,
        asking: Vec<LightAsset>,
    },

    /// One flat list: `[0, split_index)` is biding, `[split_index, len)` is asking
    Indexed {
        assets: Vec<Asset>,
        split_index: usize,
    },
}

impl SwapAssets {
    /// Rejects empty sides, out-of-bounds split indexes and amounts wider than 96 bits
    pub fn validate(&self) -> Result<()> {
        match self {
            SwapAssets::Light { biding, asking } => {
                if biding.is_empty() || asking.is_empty() {
                    return Err(Error::InvalidAssetsLength(format!(
                        "{} biding and {} asking assets",
                        biding.len(),
                        asking.len()
                    )));
                }
            }
            SwapAssets::Indexed {
                assets,
                split_index,
            } => {
                if *split_index > assets.len() {
                    return Err(Error::InvalidSplitIndex {
                        split_index: *split_index,
                        len: assets.len(),
                    });
                }
                if *split_index == 0 || *split_index == assets.len() {
                    return Err(Error::InvalidAssetsLength(format!(
                        "split index {} leaves a side of {} assets empty",
                        split_index,
                        assets.len()
                    )));
                }
                if let Some(wide) = assets.iter().find(|a| a.amount_or_id > MAX_AMOUNT_OR_ID) {
                    return Err(Error::AmountOutOfRange(format!(
                        "{} exceeds the 96-bit ceiling",
                        wide.amount_or_id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Assets the owner gives up, in order
    pub fn biding(&self) -> Vec<Asset> {
        match self {
            SwapAssets::Light { biding, .. } => biding.iter().map(LightAsset::decode).collect(),
            SwapAssets::Indexed {
                assets,
                split_index,
            } => assets[..(*split_index).min(assets.len())].to_vec(),
        }
    }

    /// Assets the owner receives, in order
    pub fn asking(&self) -> Vec<Asset> {
        match self {
            SwapAssets::Light { asking, .. } => asking.iter().map(LightAsset::decode).collect(),
            SwapAssets::Indexed {
                assets,
                split_index,
            } => assets[(*split_index).min(assets.len())..].to_vec(),
        }
    }

    /// Total number of assets on both sides
    pub fn len(&self) -> usize {
        match self {
            SwapAssets::Light { biding, asking } => biding.len() + asking.len(),
            SwapAssets::Indexed { assets, .. } => assets.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Light swap as submitted by its creator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LightSwap {
    /// Packed configuration word
    pub config: U256,

    /// Offered assets
    pub biding: Vec<LightAsset>,

    /// Requested assets
    pub asking: Vec<LightAsset>,
}

impl LightSwap {
    /// Builds a light swap, checking expiry and asset lists at `now`
    pub fn new(
        config: U256,
        biding: Vec<LightAsset>,
        asking: Vec<LightAsset>,
        now: u64,
    ) -> Result<Self> {
        let swap = Self {
            config,
            biding,
            asking,
        };
        swap.config().validate(now)?;
        swap.assets().validate()?;
        Ok(swap)
    }

    /// Builds a light swap from parallel contract and amount lists
    pub fn compose(
        config: U256,
        biding_contracts: &[Address],
        biding_amounts: &[U256],
        asking_contracts: &[Address],
        asking_amounts: &[U256],
        now: u64,
    ) -> Result<Self> {
        let biding = codec::compose_assets(biding_contracts, biding_amounts)?;
        let asking = codec::compose_assets(asking_contracts, asking_amounts)?;
        Self::new(config, biding, asking, now)
    }

    /// Decoded configuration
    pub fn config(&self) -> SwapConfig {
        codec::decode_config(self.config)
    }

    /// Asset lists in the shared representation
    pub fn assets(&self) -> SwapAssets {
        SwapAssets::Light {
            biding: self.biding.clone(),
            asking: self.asking.clone(),
        }
    }

    pub fn into_parts(self) -> (SwapConfig, SwapAssets) {
        let config = codec::decode_config(self.config);
        (
            config,
            SwapAssets::Light {
                biding: self.biding,
                asking: self.asking,
            },
        )
    }
}

/// Swap with an explicit counterparty field and a flat, split asset list
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedSwap {
    /// Only account allowed to accept; zero means anyone
    pub allowed: Address,

    /// Absolute expiry timestamp
    pub expiry: u64,

    /// Biding assets followed by asking assets
    pub assets: Vec<Asset>,

    /// Index of the first asking asset
    pub split_index: usize,
}

impl IndexedSwap {
    pub fn new(allowed: Address, expiry: u64, assets: Vec<Asset>, split_index: usize) -> Self {
        Self {
            allowed,
            expiry,
            assets,
            split_index,
        }
    }

    /// Builds a swap that stays open for `ttl` seconds after `now`
    pub fn timed(
        allowed: Address,
        ttl: u64,
        assets: Vec<Asset>,
        split_index: usize,
        now: u64,
    ) -> Self {
        Self::new(allowed, now.saturating_add(ttl), assets, split_index)
    }

    pub fn into_parts(self) -> (SwapConfig, SwapAssets) {
        (
            SwapConfig::new(self.allowed, self.expiry),
            SwapAssets::Indexed {
                assets: self.assets,
                split_index: self.split_index,
            },
        )
    }
}

/// How a swap was finalized
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Finalization {
    /// Accepted by `acceptor`; biding assets went to `receiver`
    Accepted { acceptor: Address, receiver: Address },

    /// Canceled by its owner
    Canceled,
}

/// Lifecycle state, derived from the record and the current time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SwapStatus {
    /// Open for acceptance or cancellation
    Active,
    /// Past expiry without being finalized; no transition is possible
    Expired,
    /// Assets exchanged
    Accepted,
    /// Withdrawn by the owner
    Canceled,
}

/// Stored swap
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwapRecord {
    /// Derived identifier
    pub id: SwapId,

    /// Creator of the swap
    pub owner: Address,

    /// Counterparty, expiry and reserved fields
    pub config: SwapConfig,

    /// Offered and requested assets
    pub assets: SwapAssets,

    /// Creation timestamp
    pub created_at: u64,

    /// Set once, by acceptance or cancellation
    pub finalized: bool,

    /// Terminal outcome, present iff `finalized`
    pub outcome: Option<Finalization>,
}

impl SwapRecord {
    /// Derived lifecycle state at `now`
    pub fn status(&self, now: u64) -> SwapStatus {
        match self.outcome {
            Some(Finalization::Accepted { .. }) => SwapStatus::Accepted,
            Some(Finalization::Canceled) => SwapStatus::Canceled,
            None if self.config.is_expired(now) => SwapStatus::Expired,
            None => SwapStatus::Active,
        }
    }
}
