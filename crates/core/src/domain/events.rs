use serde::{Deserialize, Serialize};
use ethers::types::Address;
use super::swap::SwapId;

/// Event emitted by a successful lifecycle transition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SwapEvent {
    /// A swap was stored
    SwapCreated {
        id: SwapId,
        owner: Address,
        allowed: Address,
    },

    /// A swap was accepted and its assets exchanged
    SwapAccepted {
        id: SwapId,
        owner: Address,
        acceptor: Address,
    },

    /// A swap was withdrawn by its owner
    SwapCanceled { id: SwapId, owner: Address },
}

impl SwapEvent {
    /// Swap the event refers to
    pub fn swap_id(&self) -> SwapId {
        match self {
            SwapEvent::SwapCreated { id, .. }
            | SwapEvent::SwapAccepted { id, .. }
            | SwapEvent::SwapCanceled { id, .. } => *id,
        }
    }
}
