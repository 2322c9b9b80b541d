use eyre::{
    eyre,
    Result,
    WrapErr as _,
};

use crate::primitive::{
    AddressBytes,
    ADDRESS_LEN,
};

pub(in crate::registry) const ETH_ADDRESS_PREFIX: &str = "registry/eth_address/";

pub(in crate::registry) fn eth_address<T: AddressBytes>(validator: &T) -> String {
    format!("{ETH_ADDRESS_PREFIX}{}", validator.display_address())
}

pub(in crate::registry) fn extract_validator_from_key(key: &str) -> Result<[u8; ADDRESS_LEN]> {
    let encoded = key
        .strip_prefix(ETH_ADDRESS_PREFIX)
        .ok_or_else(|| eyre!("key `{key}` did not have prefix `{ETH_ADDRESS_PREFIX}`"))?;
    let mut validator = [0u8; ADDRESS_LEN];
    hex::decode_to_slice(encoded, &mut validator)
        .wrap_err_with(|| format!("key `{key}` does not end in a validator address"))?;
    Ok(validator)
}
