//! Outgoing batch lifecycle.
//!
//! A batch is built by draining the top of the transfer pool and is pending until it is either
//! executed on the external chain or canceled. Both outcomes are terminal and delete the batch:
//! an executed batch's transfers are gone for good, a canceled batch's transfers go back to the
//! pool with their original priority.

mod state_ext;
pub(crate) mod storage;

use cnidarium::{
    StateDelta,
    StateWrite,
};
use eyre::{
    eyre,
    OptionExt as _,
    WrapErr as _,
};
use serde::Serialize;
pub use state_ext::{
    StateReadExt,
    StateWriteExt,
};
use tendermint::{
    abci::{
        Event,
        EventAttributeIndexExt as _,
    },
    Time,
};
use tracing::{
    info,
    instrument,
    Level,
};

use crate::{
    component::BlockContext,
    confirm::StateWriteExt as _,
    pool::{
        self,
        OutgoingTransfer,
        StateReadExt as _,
        StateWriteExt as _,
    },
    primitive::EthAddress,
    storage::commit,
    utils::serialize_display,
    BridgeError,
};

/// A bundle of transfers of a single token, to be executed once on the external chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutgoingBatch {
    #[serde(rename = "batch_nonce", serialize_with = "serialize_display")]
    pub nonce: u64,
    pub token_contract: EthAddress,
    /// Highest fee first, lowest id first among equal fees.
    #[serde(rename = "transactions")]
    pub transfers: Vec<OutgoingTransfer>,
    #[serde(rename = "block", serialize_with = "serialize_display")]
    pub created_at_height: u64,
    pub created_at: Time,
}

impl OutgoingBatch {
    /// The sum of the bridge fees of all transfers in the batch.
    #[must_use]
    pub fn total_fee(&self) -> u128 {
        self.transfers
            .iter()
            .fold(0u128, |total, transfer| total.saturating_add(transfer.fee.amount))
    }
}

/// Builds a batch from up to `max_batch_size` of the highest-fee pending transfers.
///
/// Returns the nonce of the new batch and the number of transfers it contains.
///
/// # Errors
///
/// Returns [`BridgeError::EmptyPool`] if there are no pending transfers. No nonce is consumed in
/// that case.
#[instrument(skip_all, fields(%max_batch_size), err(level = Level::DEBUG))]
pub async fn build_batch<S: StateWrite>(
    state: &mut S,
    max_batch_size: u64,
    block: &BlockContext,
) -> Result<(u64, usize), BridgeError> {
    let mut delta = StateDelta::new(&mut *state);
    let transfers = pool::pick_top(&mut delta, max_batch_size)
        .await
        .wrap_err("failed to pick transfers from the pool")?;
    let Some(first) = transfers.first() else {
        return Err(BridgeError::EmptyPool);
    };
    let token_contract = first.token.contract;

    let nonce = delta
        .get_last_batch_nonce()
        .await
        .wrap_err("failed to get last batch nonce")?
        .checked_add(1)
        .ok_or_eyre("batch nonce overflowed")?;
    let batch = OutgoingBatch {
        nonce,
        token_contract,
        transfers,
        created_at_height: block.height,
        created_at: block.time,
    };
    delta
        .put_batch(&batch)
        .wrap_err("failed to put outgoing batch")?;
    delta
        .put_last_batch_nonce(nonce)
        .wrap_err("failed to put last batch nonce")?;
    delta.record(create_outgoing_batch_event(&batch));
    commit(delta);

    let transfer_count = batch.transfers.len();
    info!(
        nonce,
        transfer_count,
        %token_contract,
        total_fee = batch.total_fee(),
        "built outgoing batch"
    );
    Ok((nonce, transfer_count))
}

/// Records that the batch with `nonce` was executed on the external chain.
///
/// The batch's transfers are discarded. Every outstanding batch with a smaller nonce is stale and
/// is canceled, returning its transfers to the pool.
///
/// # Errors
///
/// Returns [`BridgeError::UnknownBatch`] if there is no outstanding batch with `nonce`.
#[instrument(skip_all, fields(%nonce), err(level = Level::DEBUG))]
pub async fn batch_executed<S: StateWrite>(state: &mut S, nonce: u64) -> Result<(), BridgeError> {
    let mut delta = StateDelta::new(&mut *state);
    let Some(executed) = delta
        .get_batch(nonce)
        .await
        .wrap_err("failed to get outgoing batch")?
    else {
        return Err(BridgeError::UnknownBatch {
            nonce,
        });
    };

    let superseded: Vec<OutgoingBatch> = delta
        .get_outgoing_batches()
        .await
        .wrap_err("failed to get outgoing batches")?
        .into_iter()
        .take_while(|batch| batch.nonce < nonce)
        .collect();
    for batch in &superseded {
        cancel(&mut delta, batch)
            .await
            .wrap_err_with(|| format!("failed to cancel superseded batch {}", batch.nonce))?;
    }

    delta.delete_batch(nonce);
    delta
        .delete_batch_confirmations(nonce)
        .await
        .wrap_err("failed to delete confirmations of executed batch")?;
    delta.record(create_batch_executed_event(&executed));
    commit(delta);

    info!(
        nonce,
        transfer_count = executed.transfers.len(),
        superseded_count = superseded.len(),
        "outgoing batch executed"
    );
    Ok(())
}

/// Cancels the batch with `nonce`, returning its transfers to the pool.
///
/// Fees are not refunded.
///
/// # Errors
///
/// Returns [`BridgeError::UnknownBatch`] if there is no outstanding batch with `nonce`.
#[instrument(skip_all, fields(%nonce), err(level = Level::DEBUG))]
pub async fn cancel_batch<S: StateWrite>(state: &mut S, nonce: u64) -> Result<(), BridgeError> {
    let mut delta = StateDelta::new(&mut *state);
    let Some(batch) = delta
        .get_batch(nonce)
        .await
        .wrap_err("failed to get outgoing batch")?
    else {
        return Err(BridgeError::UnknownBatch {
            nonce,
        });
    };
    cancel(&mut delta, &batch).await?;
    commit(delta);

    info!(
        nonce,
        transfer_count = batch.transfers.len(),
        "canceled outgoing batch"
    );
    Ok(())
}

async fn cancel<S: StateWrite>(state: &mut S, batch: &OutgoingBatch) -> eyre::Result<()> {
    for transfer in &batch.transfers {
        pool::requeue(state, transfer)?;
    }
    let returned = u64::try_from(batch.transfers.len()).wrap_err("batch size exceeds u64")?;
    let count = state
        .get_unbatched_count()
        .await
        .wrap_err("failed to get unbatched transfer count")?;
    let count = count.checked_add(returned).ok_or_else(|| {
        eyre!("returning {returned} transfers to a pool of {count} overflows the count")
    })?;
    state
        .put_unbatched_count(count)
        .wrap_err("failed to put unbatched transfer count")?;
    state.delete_batch(batch.nonce);
    state
        .delete_batch_confirmations(batch.nonce)
        .await
        .wrap_err("failed to delete confirmations of canceled batch")?;
    state.record(create_batch_canceled_event(batch));
    Ok(())
}

fn create_outgoing_batch_event(batch: &OutgoingBatch) -> Event {
    Event::new(
        "outgoing_batch",
        [
            ("nonce", batch.nonce.to_string()).index(),
            ("tokenContract", batch.token_contract.to_string()).index(),
            ("transferCount", batch.transfers.len().to_string()).index(),
            ("totalFee", batch.total_fee().to_string()).index(),
        ],
    )
}

fn create_batch_executed_event(batch: &OutgoingBatch) -> Event {
    Event::new(
        "outgoing_batch_executed",
        [
            ("nonce", batch.nonce.to_string()).index(),
            ("tokenContract", batch.token_contract.to_string()).index(),
        ],
    )
}

fn create_batch_canceled_event(batch: &OutgoingBatch) -> Event {
    Event::new(
        "outgoing_batch_canceled",
        [
            ("nonce", batch.nonce.to_string()).index(),
            ("tokenContract", batch.token_contract.to_string()).index(),
        ],
    )
}
