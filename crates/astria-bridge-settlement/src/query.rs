//! Read surfaces for orchestrators, relayers and query clients.

use cnidarium::StateRead;
use eyre::WrapErr as _;
use tracing::instrument;

use crate::{
    batch::{
        OutgoingBatch,
        StateReadExt as _,
    },
    confirm::{
        BatchConfirmation,
        StateReadExt as _,
        ValsetConfirmation,
    },
    primitive::{
        AddressBytes,
        EthAddress,
    },
    valset::{
        StateReadExt as _,
        Valset,
    },
    BridgeError,
};

/// The most results any listing query returns.
pub const MAX_QUERY_RESULTS: usize = 100;

/// The most recent outstanding batch that `validator` has not signed yet.
///
/// # Errors
///
/// Returns an error if state could not be read.
#[instrument(skip_all, fields(validator = %validator.display_address()), err)]
pub async fn pending_batch_for_signer<S, T>(
    state: &S,
    validator: &T,
) -> Result<Option<OutgoingBatch>, BridgeError>
where
    S: StateRead + ?Sized,
    T: AddressBytes,
{
    let batches = state
        .get_outgoing_batches()
        .await
        .wrap_err("failed to get outgoing batches")?;
    for batch in batches.into_iter().rev() {
        let confirmation = state
            .get_batch_confirmation(batch.nonce, validator)
            .await
            .wrap_err("failed to get batch confirmation")?;
        if confirmation.is_none() {
            return Ok(Some(batch));
        }
    }
    Ok(None)
}

/// The most recent valset, among the last [`MAX_QUERY_RESULTS`], that `validator` has not signed
/// yet.
///
/// # Errors
///
/// Returns an error if state could not be read.
#[instrument(skip_all, fields(validator = %validator.display_address()), err)]
pub async fn pending_valset_for_signer<S, T>(
    state: &S,
    validator: &T,
) -> Result<Option<Valset>, BridgeError>
where
    S: StateRead + ?Sized,
    T: AddressBytes,
{
    for valset in last_valsets(state, MAX_QUERY_RESULTS).await? {
        let confirmation = state
            .get_valset_confirmation(valset.nonce, validator)
            .await
            .wrap_err("failed to get valset confirmation")?;
        if confirmation.is_none() {
            return Ok(Some(valset));
        }
    }
    Ok(None)
}

/// The outstanding batch with `nonce`, if it is a batch of `token_contract`.
///
/// # Errors
///
/// Returns an error if state could not be read.
#[instrument(skip_all, fields(%nonce, %token_contract), err)]
pub async fn batch_by_nonce_and_token<S: StateRead + ?Sized>(
    state: &S,
    nonce: u64,
    token_contract: &EthAddress,
) -> Result<Option<OutgoingBatch>, BridgeError> {
    let batch = state
        .get_batch(nonce)
        .await
        .wrap_err("failed to get outgoing batch")?;
    Ok(batch.filter(|batch| batch.token_contract == *token_contract))
}

/// Up to `limit` outstanding batches, newest first. `limit` is capped at [`MAX_QUERY_RESULTS`].
///
/// # Errors
///
/// Returns an error if state could not be read.
#[instrument(skip_all, fields(%limit), err)]
pub async fn last_batches<S: StateRead + ?Sized>(
    state: &S,
    limit: usize,
) -> Result<Vec<OutgoingBatch>, BridgeError> {
    let batches = state
        .get_outgoing_batches()
        .await
        .wrap_err("failed to get outgoing batches")?;
    Ok(batches
        .into_iter()
        .rev()
        .take(limit.min(MAX_QUERY_RESULTS))
        .collect())
}

/// Up to `limit` stored valsets, newest first. `limit` is capped at [`MAX_QUERY_RESULTS`].
///
/// # Errors
///
/// Returns an error if state could not be read.
#[instrument(skip_all, fields(%limit), err)]
pub async fn last_valsets<S: StateRead + ?Sized>(
    state: &S,
    limit: usize,
) -> Result<Vec<Valset>, BridgeError> {
    let last_nonce = state
        .get_last_valset_nonce()
        .await
        .wrap_err("failed to get last valset nonce")?;
    let limit = u64::try_from(limit.min(MAX_QUERY_RESULTS)).unwrap_or(u64::MAX);
    let first_nonce = last_nonce.saturating_sub(limit).saturating_add(1);
    let mut valsets = Vec::new();
    for nonce in (first_nonce..=last_nonce).rev() {
        let valset = state
            .get_valset(nonce)
            .await
            .wrap_err("failed to get valset")?
            .ok_or_else(|| eyre::eyre!("valset {nonce} is below the last nonce but not stored"))?;
        valsets.push(valset);
    }
    Ok(valsets)
}

/// All signatures collected for the valset with `nonce`, ordered by validator address.
///
/// # Errors
///
/// Returns [`BridgeError::UnknownValset`] if no valset with `nonce` was stored.
#[instrument(skip_all, fields(%nonce), err)]
pub async fn valset_confirmations<S: StateRead + ?Sized>(
    state: &S,
    nonce: u64,
) -> Result<Vec<ValsetConfirmation>, BridgeError> {
    if state
        .get_valset(nonce)
        .await
        .wrap_err("failed to get valset")?
        .is_none()
    {
        return Err(BridgeError::UnknownValset {
            nonce,
        });
    }
    Ok(state
        .get_valset_confirmations(nonce)
        .await
        .wrap_err("failed to get valset confirmations")?)
}

/// All signatures collected for the outstanding batch with `nonce` of `token_contract`, ordered
/// by validator address.
///
/// # Errors
///
/// Returns [`BridgeError::UnknownBatch`] if there is no such batch.
#[instrument(skip_all, fields(%nonce, %token_contract), err)]
pub async fn batch_confirmations<S: StateRead + ?Sized>(
    state: &S,
    nonce: u64,
    token_contract: &EthAddress,
) -> Result<Vec<BatchConfirmation>, BridgeError> {
    if batch_by_nonce_and_token(state, nonce, token_contract)
        .await?
        .is_none()
    {
        return Err(BridgeError::UnknownBatch {
            nonce,
        });
    }
    Ok(state
        .get_batch_confirmations(nonce)
        .await
        .wrap_err("failed to get batch confirmations")?)
}
