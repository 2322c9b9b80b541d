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

use super::{
    storage::{
        self,
        keys,
    },
    BatchConfirmation,
    ValsetConfirmation,
};
use crate::{
    primitive::AddressBytes,
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

fn decode_batch_confirmation(bytes: &[u8]) -> Result<BatchConfirmation> {
    StoredValue::deserialize(bytes)
        .and_then(|value| storage::BatchConfirmation::try_from(value).map(Into::into))
}

fn decode_valset_confirmation(bytes: &[u8]) -> Result<ValsetConfirmation> {
    StoredValue::deserialize(bytes)
        .and_then(|value| storage::ValsetConfirmation::try_from(value).map(Into::into))
}

/// Decodes every value under `prefix`, in key order.
async fn collect_prefix<S, T>(
    state: &S,
    prefix: &str,
    decode: fn(&[u8]) -> Result<T>,
) -> Result<Vec<T>>
where
    S: StateRead + ?Sized,
{
    let mut stream = std::pin::pin!(state.prefix_raw(prefix));
    let mut items = Vec::new();
    while let Some((key, bytes)) = stream
        .try_next()
        .await
        .map_err(anyhow_to_eyre)
        .wrap_err("failed reading confirmations from state")?
    {
        items.push(decode(&bytes).wrap_err_with(|| format!("invalid bytes under key `{key}`"))?);
    }
    Ok(items)
}

#[async_trait]
pub trait StateReadExt: StateRead {
    #[instrument(skip_all, fields(%nonce, validator = %validator.display_address()))]
    async fn get_batch_confirmation<T: AddressBytes>(
        &self,
        nonce: u64,
        validator: &T,
    ) -> Result<Option<BatchConfirmation>> {
        let Some(bytes) = self
            .get_raw(&keys::batch(nonce, validator))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw batch confirmation from state")?
        else {
            return Ok(None);
        };
        decode_batch_confirmation(&bytes)
            .map(Some)
            .wrap_err("invalid batch confirmation bytes")
    }

    /// All confirmations of the batch with `nonce`, ordered by validator address.
    #[instrument(skip_all, fields(%nonce))]
    async fn get_batch_confirmations(&self, nonce: u64) -> Result<Vec<BatchConfirmation>> {
        collect_prefix(self, &keys::batch_prefix(nonce), decode_batch_confirmation).await
    }

    #[instrument(skip_all, fields(%nonce, validator = %validator.display_address()))]
    async fn get_valset_confirmation<T: AddressBytes>(
        &self,
        nonce: u64,
        validator: &T,
    ) -> Result<Option<ValsetConfirmation>> {
        let Some(bytes) = self
            .get_raw(&keys::valset(nonce, validator))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw valset confirmation from state")?
        else {
            return Ok(None);
        };
        decode_valset_confirmation(&bytes)
            .map(Some)
            .wrap_err("invalid valset confirmation bytes")
    }

    /// All confirmations of the valset with `nonce`, ordered by validator address.
    #[instrument(skip_all, fields(%nonce))]
    async fn get_valset_confirmations(&self, nonce: u64) -> Result<Vec<ValsetConfirmation>> {
        collect_prefix(self, &keys::valset_prefix(nonce), decode_valset_confirmation).await
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all, fields(nonce = confirmation.nonce))]
    fn put_batch_confirmation(&mut self, confirmation: &BatchConfirmation) -> Result<()> {
        let bytes = StoredValue::from(storage::BatchConfirmation::from(confirmation))
            .serialize()
            .wrap_err("failed to serialize batch confirmation")?;
        self.put_raw(
            keys::batch(confirmation.nonce, &confirmation.validator),
            bytes,
        );
        Ok(())
    }

    #[instrument(skip_all, fields(nonce = confirmation.nonce))]
    fn put_valset_confirmation(&mut self, confirmation: &ValsetConfirmation) -> Result<()> {
        let bytes = StoredValue::from(storage::ValsetConfirmation::from(confirmation))
            .serialize()
            .wrap_err("failed to serialize valset confirmation")?;
        self.put_raw(
            keys::valset(confirmation.nonce, &confirmation.validator),
            bytes,
        );
        Ok(())
    }

    /// Removes every confirmation of the batch with `nonce`.
    #[instrument(skip_all, fields(%nonce))]
    async fn delete_batch_confirmations(&mut self, nonce: u64) -> Result<()> {
        let keys: Vec<String> = self
            .prefix_keys(&keys::batch_prefix(nonce))
            .try_collect()
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading batch confirmation keys from state")?;
        for key in keys {
            self.delete(key);
        }
        Ok(())
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}
