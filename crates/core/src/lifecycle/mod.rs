//! Swap lifecycle: Create -> Active -> Accepted | Canceled.
//!
//! `Expired` is derived from the clock and is terminal in practice: an expired
//! swap can be neither accepted nor canceled.

use crate::config::SwaplaceConfig;
use crate::domain::{
    Finalization, IndexedSwap, LightSwap, SwapAssets, SwapConfig, SwapEvent, SwapId, SwapRecord,
    SwapStatus,
};
use crate::registry::SwapRegistry;
use crate::settlement::{SettlementPlan, TransferOnBehalf};
use crate::{Error, InvalidSwapReason, Result};
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Caller identity and logical time of a call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallContext {
    /// Account making the call
    pub caller: Address,

    /// Current logical time (unix seconds)
    pub timestamp: u64,
}

impl CallContext {
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }
}

/// The swap protocol: registry plus the transitions allowed on it
#[derive(Debug, Clone, Default)]
pub struct Swaplace {
    config: SwaplaceConfig,
    registry: SwapRegistry,
}

impl Swaplace {
    /// Creates a protocol instance with an empty registry
    pub fn new(config: SwaplaceConfig) -> Self {
        Self {
            config,
            registry: SwapRegistry::new(),
        }
    }

    /// Protocol account
    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn config(&self) -> &SwaplaceConfig {
        &self.config
    }

    /// Creates a swap in the packed representation
    pub fn create_light_swap(&mut self, ctx: &CallContext, swap: LightSwap) -> Result<SwapId> {
        let (config, assets) = swap.into_parts();
        self.create(ctx, config, assets)
    }

    /// Creates a swap in the flat, split-index representation
    pub fn create_indexed_swap(&mut self, ctx: &CallContext, swap: IndexedSwap) -> Result<SwapId> {
        let (config, assets) = swap.into_parts();
        self.create(ctx, config, assets)
    }

    /// Stores a swap owned by the caller
    pub fn create(
        &mut self,
        ctx: &CallContext,
        config: SwapConfig,
        assets: SwapAssets,
    ) -> Result<SwapId> {
        self.registry
            .create(ctx.caller, config, assets, ctx.timestamp)
    }

    /// Accepts a swap, receiving the biding assets at the caller's account
    pub fn accept(
        &mut self,
        ctx: &CallContext,
        id: SwapId,
        assets: &mut dyn TransferOnBehalf,
    ) -> Result<()> {
        self.accept_to(ctx, id, ctx.caller, assets)
    }

    /// Accepts a swap, sending the biding assets to `receiver`.
    ///
    /// The caller pays the asking assets. On error, transfers already made by
    /// this call must be discarded by the surrounding transaction.
    pub fn accept_to(
        &mut self,
        ctx: &CallContext,
        id: SwapId,
        receiver: Address,
        assets: &mut dyn TransferOnBehalf,
    ) -> Result<()> {
        let record = self.registry.get(id)?;
        let owner = record.owner;

        if record.finalized {
            warn!("Rejected accept of finalized swap {}", id);
            return Err(Error::InvalidSwap {
                id,
                reason: InvalidSwapReason::Finalized,
            });
        }
        if record.config.is_expired(ctx.timestamp) {
            warn!("Rejected accept of expired swap {}", id);
            return Err(Error::InvalidExpiryPeriod {
                expiry: record.config.expiry,
                now: ctx.timestamp,
            });
        }
        if !record.config.allows(ctx.caller) {
            warn!("Rejected accept of swap {} by {:?}", id, ctx.caller);
            return Err(Error::Unauthorized(ctx.caller));
        }

        let plan = SettlementPlan::from_assets(owner, ctx.caller, receiver, &record.assets);
        let moved = plan.execute(assets)?;

        self.registry.mark_finalized(
            id,
            Finalization::Accepted {
                acceptor: ctx.caller,
                receiver,
            },
        )?;
        self.registry.emit(SwapEvent::SwapAccepted {
            id,
            owner,
            acceptor: ctx.caller,
        });
        info!(
            "Swap accepted: id={}, owner={:?}, acceptor={:?}, assets={}",
            id, owner, ctx.caller, moved
        );

        Ok(())
    }

    /// Cancels a swap; only its owner can, and only while it is active.
    ///
    /// A finalized or expired swap reports that state to any caller.
    pub fn cancel(&mut self, ctx: &CallContext, id: SwapId) -> Result<()> {
        let record = self.registry.get(id)?;
        let owner = record.owner;

        let reason = if record.finalized {
            Some(InvalidSwapReason::Finalized)
        } else if record.config.is_expired(ctx.timestamp) {
            Some(InvalidSwapReason::Expired)
        } else if record.owner != ctx.caller {
            Some(InvalidSwapReason::NotOwner)
        } else {
            None
        };
        if let Some(reason) = reason {
            warn!("Rejected cancel of swap {}: {}", id, reason);
            return Err(Error::InvalidSwap { id, reason });
        }

        self.registry.mark_finalized(id, Finalization::Canceled)?;
        self.registry.emit(SwapEvent::SwapCanceled { id, owner });
        info!("Swap canceled: id={}, owner={:?}", id, owner);

        Ok(())
    }

    /// Number of swaps created so far
    pub fn total_swaps(&self) -> u128 {
        self.registry.total_swaps()
    }

    pub fn get_swap(&self, id: SwapId) -> Result<&SwapRecord> {
        self.registry.get(id)
    }

    pub fn is_finalized(&self, id: SwapId) -> Result<bool> {
        self.registry.is_finalized(id)
    }

    /// Derived lifecycle state at `now`
    pub fn status(&self, id: SwapId, now: u64) -> Result<SwapStatus> {
        Ok(self.registry.get(id)?.status(now))
    }

    /// Identifier the next swap created by `owner` will receive
    pub fn next_swap_id(&self, owner: Address) -> Result<SwapId> {
        self.registry.next_swap_id(owner)
    }

    pub fn events(&self) -> &[SwapEvent] {
        self.registry.events()
    }

    pub fn registry(&self) -> &SwapRegistry {
        &self.registry
    }
}
