//! Storage forms shared by more than one module.
//!
//! Domain types are never borsh-encoded directly; these mirrors pin the on-disk layout so that a
//! change to a domain type can not silently change what is written to state.

use std::fmt::{
    self,
    Debug,
    Formatter,
};

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};

use crate::{
    pool::OutgoingTransfer as DomainOutgoingTransfer,
    primitive::{
        Erc20Token as DomainErc20Token,
        EthAddress as DomainEthAddress,
        ADDRESS_LEN,
        ETH_ADDRESS_LEN,
    },
};

#[derive(Clone, Copy, BorshSerialize, BorshDeserialize)]
pub(crate) struct EthAddress([u8; ETH_ADDRESS_LEN]);

impl Debug for EthAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", DomainEthAddress::new(self.0))
    }
}

impl From<&DomainEthAddress> for EthAddress {
    fn from(value: &DomainEthAddress) -> Self {
        Self(value.get())
    }
}

impl From<EthAddress> for DomainEthAddress {
    fn from(value: EthAddress) -> Self {
        DomainEthAddress::new(value.0)
    }
}

#[derive(Clone, Copy, BorshSerialize, BorshDeserialize)]
pub(crate) struct AddressBytes([u8; ADDRESS_LEN]);

impl Debug for AddressBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<&[u8; ADDRESS_LEN]> for AddressBytes {
    fn from(value: &[u8; ADDRESS_LEN]) -> Self {
        Self(*value)
    }
}

impl From<AddressBytes> for [u8; ADDRESS_LEN] {
    fn from(value: AddressBytes) -> Self {
        value.0
    }
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Erc20Token {
    contract: EthAddress,
    amount: u128,
}

impl From<&DomainErc20Token> for Erc20Token {
    fn from(value: &DomainErc20Token) -> Self {
        Self {
            contract: EthAddress::from(&value.contract),
            amount: value.amount,
        }
    }
}

impl From<Erc20Token> for DomainErc20Token {
    fn from(value: Erc20Token) -> Self {
        DomainErc20Token::new(value.contract.into(), value.amount)
    }
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct OutgoingTransfer {
    id: u64,
    sender: AddressBytes,
    destination: EthAddress,
    token: Erc20Token,
    fee: Erc20Token,
}

impl From<&DomainOutgoingTransfer> for OutgoingTransfer {
    fn from(value: &DomainOutgoingTransfer) -> Self {
        Self {
            id: value.id,
            sender: AddressBytes::from(&value.sender),
            destination: EthAddress::from(&value.destination),
            token: Erc20Token::from(&value.token),
            fee: Erc20Token::from(&value.fee),
        }
    }
}

impl From<OutgoingTransfer> for DomainOutgoingTransfer {
    fn from(value: OutgoingTransfer) -> Self {
        DomainOutgoingTransfer {
            id: value.id,
            sender: value.sender.into(),
            destination: value.destination.into(),
            token: value.token.into(),
            fee: value.fee.into(),
        }
    }
}
