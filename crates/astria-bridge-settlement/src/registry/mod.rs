//! Registry of the external-chain addresses validators sign with.
//!
//! A validator without a registered address does not take part in valsets.

mod state_ext;
pub(crate) mod storage;

pub use state_ext::{
    StateReadExt,
    StateWriteExt,
};
