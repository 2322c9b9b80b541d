use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::bail;

use crate::{
    params::Params as DomainParams,
    storage::StoredValue,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Params(Params),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::params) struct Params {
    batch_interval: u64,
    batch_num: u64,
    valset_interval: u64,
    valset_change_threshold_percent: u64,
}

impl From<&DomainParams> for Params {
    fn from(value: &DomainParams) -> Self {
        Self {
            batch_interval: value.batch_interval,
            batch_num: value.batch_num,
            valset_interval: value.valset_interval,
            valset_change_threshold_percent: value.valset_change_threshold_percent,
        }
    }
}

impl From<Params> for DomainParams {
    fn from(value: Params) -> Self {
        Self {
            batch_interval: value.batch_interval,
            batch_num: value.batch_num,
            valset_interval: value.valset_interval,
            valset_change_threshold_percent: value.valset_change_threshold_percent,
        }
    }
}

impl From<Params> for StoredValue<'_> {
    fn from(value: Params) -> Self {
        StoredValue::Params(Value(ValueImpl::Params(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for Params {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Params(Value(ValueImpl::Params(params))) = value else {
            bail!("params stored value type mismatch: expected params, found {value:?}");
        };
        Ok(params)
    }
}
