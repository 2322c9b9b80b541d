use std::borrow::Cow;

use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::bail;

use crate::{
    primitive::{
        EthAddress as DomainEthAddress,
        ETH_ADDRESS_LEN,
    },
    storage::StoredValue,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value<'a>(ValueImpl<'a>);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl<'a> {
    EthAddress(EthAddress<'a>),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::registry) struct EthAddress<'a>(Cow<'a, [u8; ETH_ADDRESS_LEN]>);

impl<'a> From<&'a DomainEthAddress> for EthAddress<'a> {
    fn from(address: &'a DomainEthAddress) -> Self {
        EthAddress(Cow::Borrowed(address.as_bytes()))
    }
}

impl<'a> From<EthAddress<'a>> for DomainEthAddress {
    fn from(address: EthAddress<'a>) -> Self {
        DomainEthAddress::new(address.0.into_owned())
    }
}

impl<'a> From<EthAddress<'a>> for StoredValue<'a> {
    fn from(address: EthAddress<'a>) -> Self {
        StoredValue::Registry(Value(ValueImpl::EthAddress(address)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for EthAddress<'a> {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Registry(Value(ValueImpl::EthAddress(address))) = value else {
            bail!("registry stored value type mismatch: expected eth address, found {value:?}");
        };
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_impl_existing_variants_unchanged() {
        let address = DomainEthAddress::new([0xab; ETH_ADDRESS_LEN]);
        let bytes = borsh::to_vec(&ValueImpl::EthAddress(EthAddress::from(&address))).unwrap();
        insta::assert_snapshot!(
            hex::encode(bytes),
            @"00abababababababababababababababababababab"
        );
    }

    #[test]
    fn stored_value_registry_variant_unchanged() {
        let address = DomainEthAddress::new([0xab; ETH_ADDRESS_LEN]);
        let bytes = StoredValue::from(EthAddress::from(&address))
            .serialize()
            .unwrap();
        // variant tag of `StoredValue::Registry`, then the value
        insta::assert_snapshot!(
            hex::encode(bytes),
            @"0600abababababababababababababababababababab"
        );
    }
}
