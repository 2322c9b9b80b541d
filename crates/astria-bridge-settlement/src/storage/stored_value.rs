use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    Result,
    WrapErr as _,
};

/// The single encoding of every value the bridge writes to state.
///
/// Each module contributes one variant wrapping its own private value enum. New variants must only
/// ever be appended.
#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) enum StoredValue<'a> {
    Unit,
    Params(crate::params::storage::Value),
    Pool(crate::pool::storage::Value),
    Batch(crate::batch::storage::Value),
    Valset(crate::valset::storage::Value),
    Confirm(crate::confirm::storage::Value),
    Registry(crate::registry::storage::Value<'a>),
}

impl StoredValue<'_> {
    pub(crate) fn serialize(&self) -> Result<Vec<u8>> {
        borsh::to_vec(&self).wrap_err("failed to serialize stored value")
    }

    pub(crate) fn deserialize(bytes: &[u8]) -> Result<Self> {
        borsh::from_slice(bytes).wrap_err("failed to deserialize stored value")
    }
}
