//! Settlement core of a two-chain asset bridge.
//!
//! Once per block, [`BridgeComponent::end_block`] decides whether the highest-fee pending
//! outbound transfers are bundled into a batch for the external chain, and whether the bridge
//! validators' valset has drifted enough to publish a new snapshot. Everything is kept in a
//! [`cnidarium`] state and every mutating operation is atomic.

pub mod batch;
pub mod component;
pub mod confirm;
mod error;
pub mod genesis;
pub mod params;
pub mod pool;
pub mod primitive;
pub mod query;
pub mod registry;
pub(crate) mod storage;
#[cfg(test)]
pub(crate) mod test_utils;
pub(crate) mod utils;
pub mod valset;

pub use component::{
    export_genesis,
    BlockContext,
    BridgeComponent,
};
pub use error::{
    BridgeError,
    InvalidAssetReason,
};
pub use genesis::GenesisState;
pub use params::Params;
