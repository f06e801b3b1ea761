use crate::codec;
use crate::domain::{Finalization, SwapAssets, SwapConfig, SwapEvent, SwapId, SwapRecord};
use crate::{Error, InvalidSwapReason, Result};
use ethers::types::Address;
use std::collections::HashMap;
use tracing::{debug, info};

/// Storage of swap records keyed by derived identifier
#[derive(Debug, Clone, Default)]
pub struct SwapRegistry {
    /// Every swap ever created; never removed
    records: HashMap<SwapId, SwapRecord>,

    /// Number of swaps created so far, across all owners
    total_swaps: u128,

    /// Emitted events, in order
    events: Vec<SwapEvent>,
}

impl SwapRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores a new swap, returning its identifier.
    ///
    /// The identifier uses the next global sequence number, so it always
    /// equals `next_swap_id(owner)` queried right before the call.
    pub fn create(
        &mut self,
        owner: Address,
        config: SwapConfig,
        assets: SwapAssets,
        now: u64,
    ) -> Result<SwapId> {
        assets.validate()?;
        config.validate(now)?;

        let sequence = self.total_swaps + 1;
        let id = codec::derive_swap_id(owner, sequence)?;
        debug!("Allocated swap sequence {} for {:?}", sequence, owner);

        let record = SwapRecord {
            id,
            owner,
            config,
            assets,
            created_at: now,
            finalized: false,
            outcome: None,
        };
        self.records.insert(id, record);
        self.total_swaps = sequence;

        self.emit(SwapEvent::SwapCreated {
            id,
            owner,
            allowed: config.allowed,
        });
        info!(
            "Swap created: id={}, owner={:?}, allowed={:?}, expiry={}",
            id, owner, config.allowed, config.expiry
        );

        Ok(id)
    }

    /// Looks up a swap
    pub fn get(&self, id: SwapId) -> Result<&SwapRecord> {
        let record = self.records.get(&id).ok_or(Error::SwapNotFound(id))?;
        debug_assert_eq!(record.owner, id.owner());
        Ok(record)
    }

    /// Marks a swap finalized with its outcome; fails if it already is
    pub fn mark_finalized(&mut self, id: SwapId, outcome: Finalization) -> Result<()> {
        let record = self.records.get_mut(&id).ok_or(Error::SwapNotFound(id))?;

        if record.finalized {
            return Err(Error::InvalidSwap {
                id,
                reason: InvalidSwapReason::Finalized,
            });
        }

        record.finalized = true;
        record.outcome = Some(outcome);
        Ok(())
    }

    /// Whether a swap is finalized
    pub fn is_finalized(&self, id: SwapId) -> Result<bool> {
        Ok(self.get(id)?.finalized)
    }

    /// Number of swaps created so far
    pub fn total_swaps(&self) -> u128 {
        self.total_swaps
    }

    /// Identifier the next swap created by `owner` will receive
    pub fn next_swap_id(&self, owner: Address) -> Result<SwapId> {
        codec::derive_swap_id(owner, self.total_swaps + 1)
    }

    /// Swaps created by `owner`, in creation order
    pub fn swaps_of(&self, owner: Address) -> Vec<&SwapRecord> {
        let mut swaps: Vec<&SwapRecord> = self
            .records
            .values()
            .filter(|record| record.owner == owner)
            .collect();
        swaps.sort_by_key(|record| record.id.sequence());
        swaps
    }

    /// Appends an event to the journal
    pub fn emit(&mut self, event: SwapEvent) {
        self.events.push(event);
    }

    /// Events emitted so far
    pub fn events(&self) -> &[SwapEvent] {
        &self.events
    }

    /// Drains the event journal
    pub fn take_events(&mut self) -> Vec<SwapEvent> {
        std::mem::take(&mut self.events)
    }
}
