pub mod codec;
pub mod config;
pub mod domain;
pub mod ledger;
pub mod lifecycle;
pub mod registry;
pub mod runtime;
pub mod settlement;

pub use config::SwaplaceConfig;
pub use domain::{
    Asset, Finalization, IndexedSwap, LightAsset, LightSwap, SwapAssets, SwapConfig, SwapEvent,
    SwapId, SwapRecord, SwapStatus,
};
pub use ledger::AssetLedger;
pub use lifecycle::{CallContext, Swaplace};
pub use registry::SwapRegistry;
pub use runtime::Chain;
pub use settlement::{SettlementPlan, TransferError, TransferOnBehalf};

use ethers::types::Address;
use serde::Serialize;

/// Core result type for swap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Amount or id out of range: {0}")]
    AmountOutOfRange(String),

    #[error("Auxiliary field out of range: {0} does not fit in 56 bits")]
    AuxOutOfRange(u64),

    #[error("Swap sequence out of range: {0} does not fit in 96 bits")]
    SequenceOutOfRange(u128),

    #[error("Invalid expiry: {0} does not fit in 32 bits")]
    ExpiryTooLarge(u64),

    #[error("Invalid expiry: {expiry} is not after current time {now}")]
    ExpiryInThePast { expiry: u64, now: u64 },

    #[error("Invalid assets length: {0}")]
    InvalidAssetsLength(String),

    #[error("Invalid split index {split_index} for {len} assets")]
    InvalidSplitIndex { split_index: usize, len: usize },

    #[error("Swap not found: {0}")]
    SwapNotFound(SwapId),

    #[error("Invalid address: {0:?} is not allowed to accept this swap")]
    Unauthorized(Address),

    #[error("Invalid expiry period: swap expired at {expiry}, current time is {now}")]
    InvalidExpiryPeriod { expiry: u64, now: u64 },

    #[error("Invalid swap {id}: {reason}")]
    InvalidSwap {
        id: SwapId,
        reason: InvalidSwapReason,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Why a lifecycle transition was rejected as an invalid swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSwapReason {
    #[error("caller is not the swap owner")]
    NotOwner,

    #[error("swap is already finalized")]
    Finalized,

    #[error("swap has expired")]
    Expired,
}

/// Coarse error classification shared by every entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad account identifier, amount or field out of its representable range
    MalformedInput,

    /// Empty asset side, bad split index or an expiry that is not in the future
    EncodingInvariantViolation,

    /// Unknown swap identifier
    NotFound,

    /// Caller is neither the owner (cancel) nor the permitted counterparty (accept)
    Unauthorized,

    /// Swap can no longer change state
    AlreadyFinalized,

    /// Accept attempted at or after expiry
    Expired,

    /// An asset contract rejected a transfer
    DelegatedTransferFailure,
}

impl Error {
    /// Returns the classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAddress(_)
            | Error::AmountOutOfRange(_)
            | Error::AuxOutOfRange(_)
            | Error::SequenceOutOfRange(_) => ErrorKind::MalformedInput,
            Error::ExpiryTooLarge(_)
            | Error::ExpiryInThePast { .. }
            | Error::InvalidAssetsLength(_)
            | Error::InvalidSplitIndex { .. } => ErrorKind::EncodingInvariantViolation,
            Error::SwapNotFound(_) => ErrorKind::NotFound,
            Error::Unauthorized(_) => ErrorKind::Unauthorized,
            Error::InvalidExpiryPeriod { .. } => ErrorKind::Expired,
            Error::InvalidSwap { reason, .. } => match reason {
                InvalidSwapReason::NotOwner => ErrorKind::Unauthorized,
                // An expired swap is inert: treated the same as a finalized one.
                InvalidSwapReason::Finalized | InvalidSwapReason::Expired => {
                    ErrorKind::AlreadyFinalized
                }
            },
            Error::Transfer(_) => ErrorKind::DelegatedTransferFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U256;

    #[test]
    fn test_error_kinds() {
        let id = SwapId(U256::one());

        assert_eq!(
            Error::InvalidAddress("0x12".into()).kind(),
            ErrorKind::MalformedInput
        );
        assert_eq!(
            Error::ExpiryInThePast { expiry: 1, now: 2 }.kind(),
            ErrorKind::EncodingInvariantViolation
        );
        assert_eq!(Error::SwapNotFound(id).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::Unauthorized(Address::zero()).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            Error::InvalidSwap {
                id,
                reason: InvalidSwapReason::Expired
            }
            .kind(),
            ErrorKind::AlreadyFinalized
        );
        assert_eq!(
            Error::InvalidSwap {
                id,
                reason: InvalidSwapReason::NotOwner
            }
            .kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            Error::InvalidExpiryPeriod { expiry: 1, now: 1 }.kind(),
            ErrorKind::Expired
        );
    }

    #[test]
    fn test_transfer_error_is_forwarded_verbatim() {
        let err: Error = TransferError::Rejected {
            contract: Address::from_low_u64_be(7),
            reason: "ERC20: insufficient allowance".to_string(),
        }
        .into();

        assert_eq!(err.to_string(), "ERC20: insufficient allowance");
        assert_eq!(err.kind(), ErrorKind::DelegatedTransferFailure);
    }
}
