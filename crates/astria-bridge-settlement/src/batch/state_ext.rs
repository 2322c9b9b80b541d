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
    OutgoingBatch,
};
use crate::{
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

fn decode_batch(bytes: &[u8]) -> Result<OutgoingBatch> {
    StoredValue::deserialize(bytes)
        .and_then(storage::OutgoingBatch::try_from)
        .and_then(OutgoingBatch::try_from)
}

#[async_trait]
pub trait StateReadExt: StateRead {
    /// The nonce of the most recently built batch, or 0 if none was ever built.
    #[instrument(skip_all)]
    async fn get_last_batch_nonce(&self) -> Result<u64> {
        let Some(bytes) = self
            .get_raw(keys::LAST_NONCE)
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw last batch nonce from state")?
        else {
            return Ok(0);
        };
        StoredValue::deserialize(&bytes)
            .and_then(|value| storage::Nonce::try_from(value).map(u64::from))
            .wrap_err("invalid last batch nonce bytes")
    }

    #[instrument(skip_all, fields(nonce = nonce))]
    async fn get_batch(&self, nonce: u64) -> Result<Option<OutgoingBatch>> {
        let Some(bytes) = self
            .get_raw(&keys::by_nonce(nonce))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw outgoing batch from state")?
        else {
            return Ok(None);
        };
        decode_batch(&bytes)
            .map(Some)
            .wrap_err("invalid outgoing batch bytes")
    }

    /// All outstanding batches, lowest nonce first.
    #[instrument(skip_all)]
    async fn get_outgoing_batches(&self) -> Result<Vec<OutgoingBatch>> {
        let mut stream = std::pin::pin!(self.prefix_raw(keys::BY_NONCE_PREFIX));
        let mut batches = Vec::new();
        while let Some((key, bytes)) = stream
            .try_next()
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading outgoing batches from state")?
        {
            let batch = decode_batch(&bytes)
                .wrap_err_with(|| format!("invalid outgoing batch bytes under key `{key}`"))?;
            batches.push(batch);
        }
        Ok(batches)
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all)]
    fn put_last_batch_nonce(&mut self, nonce: u64) -> Result<()> {
        let bytes = StoredValue::from(storage::Nonce::from(nonce))
            .serialize()
            .wrap_err("failed to serialize last batch nonce")?;
        self.put_raw(keys::LAST_NONCE.to_string(), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(nonce = batch.nonce))]
    fn put_batch(&mut self, batch: &OutgoingBatch) -> Result<()> {
        let bytes = StoredValue::from(storage::OutgoingBatch::from(batch))
            .serialize()
            .wrap_err("failed to serialize outgoing batch")?;
        self.put_raw(keys::by_nonce(batch.nonce), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(nonce = nonce))]
    fn delete_batch(&mut self, nonce: u64) {
        self.delete(keys::by_nonce(nonce));
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}
