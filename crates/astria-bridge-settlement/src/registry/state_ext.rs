use std::collections::BTreeMap;

use async_trait::async_trait;
use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::{
    Result,
    WrapErr as _,
};
use futures::TryStreamExt as _;
use tracing::instrument;

use super::storage::{
    self,
    keys,
};
use crate::{
    primitive::{
        AddressBytes,
        EthAddress,
        ADDRESS_LEN,
    },
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

#[async_trait]
pub trait StateReadExt: StateRead {
    #[instrument(skip_all, fields(validator = %validator.display_address()))]
    async fn get_validator_eth_address<T: AddressBytes>(
        &self,
        validator: &T,
    ) -> Result<Option<EthAddress>> {
        let Some(bytes) = self
            .get_raw(&keys::eth_address(validator))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw validator eth address from state")?
        else {
            return Ok(None);
        };
        StoredValue::deserialize(&bytes)
            .and_then(|value| storage::EthAddress::try_from(value).map(|a| Some(a.into())))
            .wrap_err("invalid validator eth address bytes")
    }

    /// All registrations, keyed by validator address.
    #[instrument(skip_all)]
    async fn get_registered_eth_addresses(&self) -> Result<BTreeMap<[u8; ADDRESS_LEN], EthAddress>> {
        let mut stream = std::pin::pin!(self.prefix_raw(keys::ETH_ADDRESS_PREFIX));
        let mut registrations = BTreeMap::new();
        while let Some((key, bytes)) = stream
            .try_next()
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading validator eth addresses from state")?
        {
            let validator = keys::extract_validator_from_key(&key)?;
            let eth_address = StoredValue::deserialize(&bytes)
                .and_then(|value| storage::EthAddress::try_from(value).map(EthAddress::from))
                .wrap_err_with(|| format!("invalid validator eth address bytes under key `{key}`"))?;
            registrations.insert(validator, eth_address);
        }
        Ok(registrations)
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    /// Registers `eth_address` for `validator`, replacing an earlier registration.
    #[instrument(skip_all, fields(validator = %validator.display_address(), %eth_address))]
    fn put_validator_eth_address<T: AddressBytes>(
        &mut self,
        validator: &T,
        eth_address: &EthAddress,
    ) -> Result<()> {
        let bytes = StoredValue::from(storage::EthAddress::from(eth_address))
            .serialize()
            .wrap_err("failed to serialize validator eth address")?;
        self.put_raw(keys::eth_address(validator), bytes);
        Ok(())
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}
