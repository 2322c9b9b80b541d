use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::bail;

use crate::storage::{
    values::{
        Erc20Token,
        OutgoingTransfer as StoredTransfer,
    },
    StoredValue,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Count(Count),
    OutgoingTransfer(OutgoingTransfer),
    FeeIndexEntry(FeeIndexEntry),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::pool) struct Count(u64);

impl From<u64> for Count {
    fn from(value: u64) -> Self {
        Count(value)
    }
}

impl From<Count> for u64 {
    fn from(value: Count) -> Self {
        value.0
    }
}

impl From<Count> for StoredValue<'_> {
    fn from(value: Count) -> Self {
        StoredValue::Pool(Value(ValueImpl::Count(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for Count {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Pool(Value(ValueImpl::Count(count))) = value else {
            bail!("pool stored value type mismatch: expected count, found {value:?}");
        };
        Ok(count)
    }
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::pool) struct OutgoingTransfer(StoredTransfer);

impl From<&crate::pool::OutgoingTransfer> for OutgoingTransfer {
    fn from(value: &crate::pool::OutgoingTransfer) -> Self {
        Self(StoredTransfer::from(value))
    }
}

impl From<OutgoingTransfer> for crate::pool::OutgoingTransfer {
    fn from(value: OutgoingTransfer) -> Self {
        value.0.into()
    }
}

impl From<OutgoingTransfer> for StoredValue<'_> {
    fn from(value: OutgoingTransfer) -> Self {
        StoredValue::Pool(Value(ValueImpl::OutgoingTransfer(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for OutgoingTransfer {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Pool(Value(ValueImpl::OutgoingTransfer(transfer))) = value else {
            bail!("pool stored value type mismatch: expected outgoing transfer, found {value:?}");
        };
        Ok(transfer)
    }
}

/// The fee of a transfer, stored under its fee index key so that a scan of the index can filter
/// by token contract without loading transfer bodies.
#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::pool) struct FeeIndexEntry(Erc20Token);

impl From<&crate::primitive::Erc20Token> for FeeIndexEntry {
    fn from(value: &crate::primitive::Erc20Token) -> Self {
        Self(Erc20Token::from(value))
    }
}

impl From<FeeIndexEntry> for crate::primitive::Erc20Token {
    fn from(value: FeeIndexEntry) -> Self {
        value.0.into()
    }
}

impl From<FeeIndexEntry> for StoredValue<'_> {
    fn from(value: FeeIndexEntry) -> Self {
        StoredValue::Pool(Value(ValueImpl::FeeIndexEntry(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for FeeIndexEntry {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Pool(Value(ValueImpl::FeeIndexEntry(entry))) = value else {
            bail!("pool stored value type mismatch: expected fee index entry, found {value:?}");
        };
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_rejected_as_a_transfer() {
        let stored = StoredValue::from(Count::from(3));
        let bytes = stored.serialize().unwrap();
        let decoded = StoredValue::deserialize(&bytes).unwrap();
        let _ = OutgoingTransfer::try_from(decoded)
            .expect_err("a count must not decode as an outgoing transfer");
    }
}
