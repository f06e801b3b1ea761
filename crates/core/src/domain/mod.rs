pub mod assets;
pub mod events;
pub mod swap;

pub use assets::{Asset, LightAsset};
pub use events::SwapEvent;
pub use swap::{
    Finalization, IndexedSwap, LightSwap, SwapAssets, SwapConfig, SwapId, SwapRecord, SwapStatus,
};
