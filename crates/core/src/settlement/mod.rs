use serde::{Deserialize, Serialize};
use ethers::types::{Address, U256};
use crate::domain::SwapAssets;
use tracing::debug;

/// Failure reported by an asset contract, forwarded unchanged
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// The contract refused the transfer (allowance, ownership, balance...)
    #[error("{reason}")]
    Rejected { contract: Address, reason: String },

    /// No contract is deployed at the asset address
    #[error("Transfer failed: no asset contract at {0:?}")]
    UnknownContract(Address),
}

/// "Transfer on behalf" capability of the external asset contracts.
///
/// The call is made by the protocol; `from` must have authorized it beforehand.
/// Implementations decide fungible versus non-fungible semantics per contract.
pub trait TransferOnBehalf {
    fn transfer_from(
        &mut self,
        contract: Address,
        from: Address,
        to: Address,
        amount_or_id: U256,
    ) -> Result<(), TransferError>;
}

/// Side of the swap a leg belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    /// Owner to acceptor
    Biding,
    /// Acceptor to owner
    Asking,
}

/// One asset movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferLeg {
    /// Side of the swap
    pub side: Side,

    /// Asset contract
    pub contract: Address,

    /// Current holder
    pub from: Address,

    /// New holder
    pub to: Address,

    /// Amount or token id
    pub amount_or_id: U256,
}

/// Ordered transfers that settle an accepted swap
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SettlementPlan {
    /// Biding legs in list order, then asking legs in list order
    pub legs: Vec<TransferLeg>,
}

impl SettlementPlan {
    /// Partitions the swap assets into legs.
    ///
    /// Biding assets move from `owner` to `receiver`; asking assets move from
    /// `acceptor` to `owner`.
    pub fn from_assets(
        owner: Address,
        acceptor: Address,
        receiver: Address,
        assets: &SwapAssets,
    ) -> Self {
        let biding = assets.biding().into_iter().map(|asset| TransferLeg {
            side: Side::Biding,
            contract: asset.contract,
            from: owner,
            to: receiver,
            amount_or_id: asset.amount_or_id,
        });
        let asking = assets.asking().into_iter().map(|asset| TransferLeg {
            side: Side::Asking,
            contract: asset.contract,
            from: acceptor,
            to: owner,
            amount_or_id: asset.amount_or_id,
        });

        Self {
            legs: biding.chain(asking).collect(),
        }
    }

    /// Number of legs on `side`
    pub fn count(&self, side: Side) -> usize {
        self.legs.iter().filter(|leg| leg.side == side).count()
    }

    /// Runs every leg in order and stops at the first failure.
    ///
    /// Transfers already made are not undone here: the caller runs this inside
    /// a transaction that is discarded on error.
    pub fn execute(&self, assets: &mut dyn TransferOnBehalf) -> Result<usize, TransferError> {
        for (index, leg) in self.legs.iter().enumerate() {
            debug!(
                "Transfer leg {}: {:?} {:?} -> {:?}, contract={:?}, amount_or_id={}",
                index, leg.side, leg.from, leg.to, leg.contract, leg.amount_or_id
            );
            assets.transfer_from(leg.contract, leg.from, leg.to, leg.amount_or_id)?;
        }

        Ok(self.legs.len())
    }
}
