use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    bail,
    eyre,
    WrapErr as _,
};
use tendermint::Time;

use crate::storage::{
    values::{
        EthAddress,
        OutgoingTransfer,
    },
    StoredValue,
};

const NANOS_PER_SECOND: i128 = 1_000_000_000;

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Nonce(Nonce),
    OutgoingBatch(OutgoingBatch),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::batch) struct Nonce(u64);

impl From<u64> for Nonce {
    fn from(value: u64) -> Self {
        Nonce(value)
    }
}

impl From<Nonce> for u64 {
    fn from(value: Nonce) -> Self {
        value.0
    }
}

impl From<Nonce> for StoredValue<'_> {
    fn from(value: Nonce) -> Self {
        StoredValue::Batch(Value(ValueImpl::Nonce(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for Nonce {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Batch(Value(ValueImpl::Nonce(nonce))) = value else {
            bail!("batch stored value type mismatch: expected nonce, found {value:?}");
        };
        Ok(nonce)
    }
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::batch) struct OutgoingBatch {
    nonce: u64,
    token_contract: EthAddress,
    transfers: Vec<OutgoingTransfer>,
    created_at_height: u64,
    created_at_unix_nanos: i128,
}

impl From<&crate::batch::OutgoingBatch> for OutgoingBatch {
    fn from(value: &crate::batch::OutgoingBatch) -> Self {
        Self {
            nonce: value.nonce,
            token_contract: EthAddress::from(&value.token_contract),
            transfers: value.transfers.iter().map(OutgoingTransfer::from).collect(),
            created_at_height: value.created_at_height,
            created_at_unix_nanos: value.created_at.unix_timestamp_nanos(),
        }
    }
}

impl TryFrom<OutgoingBatch> for crate::batch::OutgoingBatch {
    type Error = eyre::Report;

    fn try_from(value: OutgoingBatch) -> Result<Self, Self::Error> {
        let seconds = i64::try_from(value.created_at_unix_nanos.div_euclid(NANOS_PER_SECOND))
            .wrap_err("batch creation time is out of range")?;
        let nanos = u32::try_from(value.created_at_unix_nanos.rem_euclid(NANOS_PER_SECOND))
            .wrap_err("batch creation time is out of range")?;
        let created_at = Time::from_unix_timestamp(seconds, nanos)
            .map_err(|err| eyre!("batch creation time is not a valid timestamp: {err}"))?;
        Ok(Self {
            nonce: value.nonce,
            token_contract: value.token_contract.into(),
            transfers: value.transfers.into_iter().map(Into::into).collect(),
            created_at_height: value.created_at_height,
            created_at,
        })
    }
}

impl From<OutgoingBatch> for StoredValue<'_> {
    fn from(value: OutgoingBatch) -> Self {
        StoredValue::Batch(Value(ValueImpl::OutgoingBatch(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for OutgoingBatch {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Batch(Value(ValueImpl::OutgoingBatch(batch))) = value else {
            bail!("batch stored value type mismatch: expected outgoing batch, found {value:?}");
        };
        Ok(batch)
    }
}
