use ethers::types::Address;
use serde::{Deserialize, Serialize};

/// Protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwaplaceConfig {
    /// Account of the protocol itself; asset contracts check allowances against it
    pub address: Address,
}

impl Default for SwaplaceConfig {
    fn default() -> Self {
        Self {
            address: Address::from_low_u64_be(0x5a9),
        }
    }
}
