use std::{
    pin::Pin,
    task::{
        ready,
        Context,
        Poll,
    },
};

use async_trait::async_trait;
use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::{
    Result,
    WrapErr as _,
};
use futures::{
    Stream,
    TryStreamExt as _,
};
use pin_project_lite::pin_project;
use tracing::instrument;

use super::{
    storage::{
        self,
        keys,
    },
    OutgoingTransfer,
};
use crate::{
    primitive::Erc20Token,
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

/// A pending transfer as seen through the fee index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolEntry {
    pub id: u64,
    pub fee: Erc20Token,
}

pin_project! {
    /// A lazy walk over the fee index, highest fee first and lowest id first among equal fees.
    ///
    /// The stream reflects the state at the time it was created. It is finite and can not be
    /// restarted; create a new one to scan again.
    pub struct FeeIndexStream<St> {
        #[pin]
        underlying: St,
    }
}

impl<St> Stream for FeeIndexStream<St>
where
    St: Stream<Item = anyhow::Result<(String, Vec<u8>)>>,
{
    type Item = Result<PoolEntry>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        let (key, bytes) = match ready!(this.underlying.as_mut().poll_next(cx)) {
            Some(Ok(item)) => item,
            Some(Err(err)) => {
                return Poll::Ready(Some(
                    Err(anyhow_to_eyre(err)).wrap_err("failed reading from state"),
                ));
            }
            None => return Poll::Ready(None),
        };
        let id = match keys::extract_id_from_fee_index_key(&key) {
            Ok(id) => id,
            Err(err) => return Poll::Ready(Some(Err(err))),
        };
        let fee = StoredValue::deserialize(&bytes)
            .and_then(|value| storage::FeeIndexEntry::try_from(value).map(Erc20Token::from))
            .wrap_err_with(|| format!("invalid fee index entry bytes under key `{key}`"));
        Poll::Ready(Some(fee.map(|fee| PoolEntry {
            id,
            fee,
        })))
    }
}

#[async_trait]
pub trait StateReadExt: StateRead {
    /// The id the next pushed transfer will receive. Ids start at 1.
    #[instrument(skip_all)]
    async fn get_next_transfer_id(&self) -> Result<u64> {
        let Some(bytes) = self
            .get_raw(keys::NEXT_TRANSFER_ID)
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw next transfer id from state")?
        else {
            return Ok(1);
        };
        StoredValue::deserialize(&bytes)
            .and_then(|value| storage::Count::try_from(value).map(u64::from))
            .wrap_err("invalid next transfer id bytes")
    }

    /// The number of transfers in the pool that are not part of any batch.
    #[instrument(skip_all)]
    async fn get_unbatched_count(&self) -> Result<u64> {
        let Some(bytes) = self
            .get_raw(keys::UNBATCHED_COUNT)
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw unbatched transfer count from state")?
        else {
            return Ok(0);
        };
        StoredValue::deserialize(&bytes)
            .and_then(|value| storage::Count::try_from(value).map(u64::from))
            .wrap_err("invalid unbatched transfer count bytes")
    }

    #[instrument(skip_all, fields(id = id))]
    async fn get_pool_transfer(&self, id: u64) -> Result<Option<OutgoingTransfer>> {
        let Some(bytes) = self
            .get_raw(&keys::transfer(id))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw pool transfer from state")?
        else {
            return Ok(None);
        };
        StoredValue::deserialize(&bytes)
            .and_then(|value| {
                storage::OutgoingTransfer::try_from(value).map(|t| Some(OutgoingTransfer::from(t)))
            })
            .wrap_err("invalid pool transfer bytes")
    }

    #[instrument(skip_all)]
    fn pool_fee_index(&self) -> FeeIndexStream<Self::PrefixRawStream> {
        FeeIndexStream {
            underlying: self.prefix_raw(keys::FEE_INDEX_PREFIX),
        }
    }

    /// All pending transfers in the order a batch would pick them.
    #[instrument(skip_all)]
    async fn get_pending_transfers(&self) -> Result<Vec<OutgoingTransfer>> {
        let entries: Vec<PoolEntry> = self
            .pool_fee_index()
            .try_collect()
            .await
            .wrap_err("failed to scan the fee index")?;
        let mut transfers = Vec::with_capacity(entries.len());
        for entry in entries {
            let transfer = self
                .get_pool_transfer(entry.id)
                .await?
                .ok_or_else(|| {
                    eyre::eyre!("fee index references transfer {} without a body", entry.id)
                })?;
            transfers.push(transfer);
        }
        Ok(transfers)
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all)]
    fn put_next_transfer_id(&mut self, id: u64) -> Result<()> {
        let bytes = StoredValue::from(storage::Count::from(id))
            .serialize()
            .wrap_err("failed to serialize next transfer id")?;
        self.put_raw(keys::NEXT_TRANSFER_ID.to_string(), bytes);
        Ok(())
    }

    #[instrument(skip_all)]
    fn put_unbatched_count(&mut self, count: u64) -> Result<()> {
        let bytes = StoredValue::from(storage::Count::from(count))
            .serialize()
            .wrap_err("failed to serialize unbatched transfer count")?;
        self.put_raw(keys::UNBATCHED_COUNT.to_string(), bytes);
        Ok(())
    }

    /// Makes a transfer available for batching: writes its body and its fee index entry.
    #[instrument(skip_all, fields(id = transfer.id))]
    fn put_pool_transfer(&mut self, transfer: &OutgoingTransfer) -> Result<()> {
        let body = StoredValue::from(storage::OutgoingTransfer::from(transfer))
            .serialize()
            .wrap_err("failed to serialize pool transfer")?;
        let index_entry = StoredValue::from(storage::FeeIndexEntry::from(&transfer.fee))
            .serialize()
            .wrap_err("failed to serialize fee index entry")?;
        self.put_raw(keys::transfer(transfer.id), body);
        self.put_raw(keys::fee_index(transfer.fee.amount, transfer.id), index_entry);
        Ok(())
    }

    /// Removes a transfer's body and fee index entry.
    #[instrument(skip_all, fields(id = id))]
    fn delete_pool_transfer(&mut self, id: u64, fee: u128) {
        self.delete(keys::transfer(id));
        self.delete(keys::fee_index(fee, id));
    }
}

impl<T: StateWrite + ?Sized> StateWriteExt for T {}
