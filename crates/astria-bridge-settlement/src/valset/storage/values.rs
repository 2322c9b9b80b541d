use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::bail;

use crate::storage::{
    values::EthAddress,
    StoredValue,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Nonce(Nonce),
    Valset(Valset),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::valset) struct Nonce(u64);

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
        StoredValue::Valset(Value(ValueImpl::Nonce(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for Nonce {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Valset(Value(ValueImpl::Nonce(nonce))) = value else {
            bail!("valset stored value type mismatch: expected nonce, found {value:?}");
        };
        Ok(nonce)
    }
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
struct Member {
    eth_address: EthAddress,
    power: u64,
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::valset) struct Valset {
    nonce: u64,
    height: u64,
    members: Vec<Member>,
}

impl From<&crate::valset::Valset> for Valset {
    fn from(value: &crate::valset::Valset) -> Self {
        Self {
            nonce: value.nonce,
            height: value.height,
            members: value
                .members
                .iter()
                .map(|member| Member {
                    eth_address: EthAddress::from(&member.eth_address),
                    power: member.power,
                })
                .collect(),
        }
    }
}

impl From<Valset> for crate::valset::Valset {
    fn from(value: Valset) -> Self {
        Self {
            nonce: value.nonce,
            height: value.height,
            members: value
                .members
                .into_iter()
                .map(|member| crate::valset::ValsetMember {
                    eth_address: member.eth_address.into(),
                    power: member.power,
                })
                .collect(),
        }
    }
}

impl From<Valset> for StoredValue<'_> {
    fn from(value: Valset) -> Self {
        StoredValue::Valset(Value(ValueImpl::Valset(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for Valset {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Valset(Value(ValueImpl::Valset(valset))) = value else {
            bail!("valset stored value type mismatch: expected valset, found {value:?}");
        };
        Ok(valset)
    }
}
