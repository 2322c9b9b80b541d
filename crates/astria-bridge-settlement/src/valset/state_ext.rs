use async_trait::async_trait;
use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::{
    Result,
    WrapErr as _,
};
use tracing::instrument;

use super::{
    storage::{
        self,
        keys,
    },
    Valset,
};
use crate::{
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

#[async_trait]
pub trait StateReadExt: StateRead {
    /// The nonce of the most recently stored valset, or 0 if none was ever stored.
    #[instrument(skip_all)]
    async fn get_last_valset_nonce(&self) -> Result<u64> {
        let Some(bytes) = self
            .get_raw(keys::LAST_NONCE)
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw last valset nonce from state")?
        else {
            return Ok(0);
        };
        StoredValue::deserialize(&bytes)
            .and_then(|value| storage::Nonce::try_from(value).map(u64::from))
            .wrap_err("invalid last valset nonce bytes")
    }

    #[instrument(skip_all, fields(%nonce))]
    async fn get_valset(&self, nonce: u64) -> Result<Option<Valset>> {
        let Some(bytes) = self
            .get_raw(&keys::by_nonce(nonce))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw valset from state")?
        else {
            return Ok(None);
        };
        StoredValue::deserialize(&bytes)
            .and_then(|value| storage::Valset::try_from(value).map(|v| Some(Valset::from(v))))
            .wrap_err("invalid valset bytes")
    }

    /// The valset with the greatest nonce, if any was stored.
    #[instrument(skip_all)]
    async fn get_latest_valset(&self) -> Result<Option<Valset>> {
        let nonce = self.get_last_valset_nonce().await?;
        if nonce == 0 {
            return Ok(None);
        }
        let valset = self
            .get_valset(nonce)
            .await?
            .ok_or_else(|| eyre::eyre!("last valset nonce {nonce} has no stored valset"))?;
        Ok(Some(valset))
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all)]
    fn put_last_valset_nonce(&mut self, nonce: u64) -> Result<()> {
        let bytes = StoredValue::from(storage::Nonce::from(nonce))
            .serialize()
            .wrap_err("failed to serialize last valset nonce")?;
        self.put_raw(keys::LAST_NONCE.to_string(), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(nonce = valset.nonce))]
    fn put_valset(&mut self, valset: &Valset) -> Result<()> {
        let bytes = StoredValue::from(storage::Valset::from(valset))
            .serialize()
            .wrap_err("failed to serialize valset")?;
        self.put_raw(keys::by_nonce(valset.nonce), bytes);
        Ok(())
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}
