mod state_ext;
pub(crate) mod storage;

use serde::{
    Deserialize,
    Serialize,
};
pub use state_ext::{
    StateReadExt,
    StateWriteExt,
};

use crate::BridgeError;

/// Parameters steering the per-block batch and valset decisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Params {
    /// A batch is built every `batch_interval` blocks, regardless of pool size.
    pub batch_interval: u64,
    /// Maximum number of transfers per batch. A full batch's worth of pending transfers also
    /// triggers a build off-cadence.
    pub batch_num: u64,
    /// A valset snapshot is stored every `valset_interval` blocks.
    pub valset_interval: u64,
    /// Power drift, in percent of the current total power, that triggers a valset snapshot
    /// off-cadence.
    pub valset_change_threshold_percent: u64,
}

impl Params {
    /// Checks that the parameters can drive the block hook.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InvalidParams`] if an interval or the batch size is zero, or if the
    /// change threshold exceeds 100 percent.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.batch_interval == 0 {
            return Err(BridgeError::InvalidParams("batch interval must be positive"));
        }
        if self.batch_num == 0 {
            return Err(BridgeError::InvalidParams("batch size must be positive"));
        }
        if self.valset_interval == 0 {
            return Err(BridgeError::InvalidParams("valset interval must be positive"));
        }
        if self.valset_change_threshold_percent > 100 {
            return Err(BridgeError::InvalidParams(
                "valset change threshold must be at most 100 percent",
            ));
        }
        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            batch_interval: 10,
            batch_num: 100,
            valset_interval: 1_000,
            valset_change_threshold_percent: 5,
        }
    }
}
