use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::bail;

use crate::storage::{
    values::{
        AddressBytes,
        EthAddress,
    },
    StoredValue,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    BatchConfirmation(BatchConfirmation),
    ValsetConfirmation(ValsetConfirmation),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::confirm) struct BatchConfirmation {
    nonce: u64,
    token_contract: EthAddress,
    validator: AddressBytes,
    eth_signer: EthAddress,
    signature: Vec<u8>,
}

impl From<&crate::confirm::BatchConfirmation> for BatchConfirmation {
    fn from(value: &crate::confirm::BatchConfirmation) -> Self {
        Self {
            nonce: value.nonce,
            token_contract: EthAddress::from(&value.token_contract),
            validator: AddressBytes::from(&value.validator),
            eth_signer: EthAddress::from(&value.eth_signer),
            signature: value.signature.clone(),
        }
    }
}

impl From<BatchConfirmation> for crate::confirm::BatchConfirmation {
    fn from(value: BatchConfirmation) -> Self {
        Self {
            nonce: value.nonce,
            token_contract: value.token_contract.into(),
            validator: value.validator.into(),
            eth_signer: value.eth_signer.into(),
            signature: value.signature,
        }
    }
}

impl From<BatchConfirmation> for StoredValue<'_> {
    fn from(value: BatchConfirmation) -> Self {
        StoredValue::Confirm(Value(ValueImpl::BatchConfirmation(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for BatchConfirmation {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Confirm(Value(ValueImpl::BatchConfirmation(confirmation))) = value else {
            bail!("confirm stored value type mismatch: expected batch confirmation, found {value:?}");
        };
        Ok(confirmation)
    }
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::confirm) struct ValsetConfirmation {
    nonce: u64,
    validator: AddressBytes,
    eth_address: EthAddress,
    signature: Vec<u8>,
}

impl From<&crate::confirm::ValsetConfirmation> for ValsetConfirmation {
    fn from(value: &crate::confirm::ValsetConfirmation) -> Self {
        Self {
            nonce: value.nonce,
            validator: AddressBytes::from(&value.validator),
            eth_address: EthAddress::from(&value.eth_address),
            signature: value.signature.clone(),
        }
    }
}

impl From<ValsetConfirmation> for crate::confirm::ValsetConfirmation {
    fn from(value: ValsetConfirmation) -> Self {
        Self {
            nonce: value.nonce,
            validator: value.validator.into(),
            eth_address: value.eth_address.into(),
            signature: value.signature,
        }
    }
}

impl From<ValsetConfirmation> for StoredValue<'_> {
    fn from(value: ValsetConfirmation) -> Self {
        StoredValue::Confirm(Value(ValueImpl::ValsetConfirmation(value)))
    }
}

impl<'a> TryFrom<StoredValue<'a>> for ValsetConfirmation {
    type Error = eyre::Report;

    fn try_from(value: StoredValue<'a>) -> Result<Self, Self::Error> {
        let StoredValue::Confirm(Value(ValueImpl::ValsetConfirmation(confirmation))) = value
        else {
            bail!(
                "confirm stored value type mismatch: expected valset confirmation, found {value:?}"
            );
        };
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::{
        EthAddress as DomainEthAddress,
        ADDRESS_LEN,
        ETH_ADDRESS_LEN,
    };

    #[test]
    fn stored_value_confirm_variant_unchanged() {
        let confirmation = crate::confirm::ValsetConfirmation {
            nonce: 1,
            validator: [0x11; ADDRESS_LEN],
            eth_address: DomainEthAddress::new([0x22; ETH_ADDRESS_LEN]),
            signature: vec![0xff],
        };
        let bytes = StoredValue::from(ValsetConfirmation::from(&confirmation))
            .serialize()
            .unwrap();
        // `Confirm` tag, `ValsetConfirmation` tag, nonce, validator, eth address, signature
        insta::assert_snapshot!(
            hex::encode(bytes),
            @"050101000000000000001111111111111111111111111111111111111111222222222222222222222222222222222222222201000000ff"
        );
    }
}
