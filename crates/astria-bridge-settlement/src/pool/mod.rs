//! The pool of pending outbound transfers.
//!
//! Transfers are indexed by bridge fee, highest first, with equal fees kept in insertion order.
//! A transfer is either available here or contained in exactly one outstanding batch; picking a
//! transfer for a batch removes it from the pool and cancelling that batch puts it back under its
//! original index key.

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
use futures::TryStreamExt as _;
use serde::Serialize;
pub use state_ext::{
    FeeIndexStream,
    PoolEntry,
    StateReadExt,
    StateWriteExt,
};
use tendermint::abci::{
    Event,
    EventAttributeIndexExt as _,
};
use tracing::{
    debug,
    instrument,
    Level,
};

use crate::{
    error::InvalidAssetReason,
    primitive::{
        AddressBytes as _,
        Coin,
        Erc20Token,
        EthAddress,
        ADDRESS_LEN,
    },
    storage::commit,
    BridgeError,
};

/// A user's request to send tokens to the external chain.
#[derive(Clone, Debug)]
pub struct OutgoingTransferRequest {
    pub sender: [u8; ADDRESS_LEN],
    pub destination: EthAddress,
    pub amount: Coin,
    pub bridge_fee: Coin,
}

/// A pending outbound transfer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OutgoingTransfer {
    pub id: u64,
    #[serde(serialize_with = "serialize_sender")]
    pub sender: [u8; ADDRESS_LEN],
    pub destination: EthAddress,
    pub token: Erc20Token,
    pub fee: Erc20Token,
}

fn serialize_sender<S: serde::Serializer>(
    sender: &[u8; ADDRESS_LEN],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&sender.display_address())
}

fn parse_asset(field: &'static str, coin: &Coin) -> Result<Erc20Token, BridgeError> {
    Erc20Token::try_from(coin)
        .map_err(|source| BridgeError::invalid_asset(field, InvalidAssetReason::from(source)))
}

/// Adds a transfer to the pool and returns its id.
///
/// # Errors
///
/// Returns [`BridgeError::InvalidAsset`] if the amount or fee is not a bridged ERC-20 voucher, if
/// the amount is zero, or if amount and fee name different contracts. Nothing is written in that
/// case and no id is consumed.
#[instrument(skip_all, err(level = Level::DEBUG))]
pub async fn push_to_outgoing_pool<S: StateWrite>(
    state: &mut S,
    request: OutgoingTransferRequest,
) -> Result<u64, BridgeError> {
    let token = parse_asset("amount", &request.amount)?;
    let fee = parse_asset("bridge fee", &request.bridge_fee)?;
    if token.amount == 0 {
        return Err(BridgeError::invalid_asset(
            "amount",
            InvalidAssetReason::ZeroAmount,
        ));
    }
    if token.contract != fee.contract {
        return Err(BridgeError::invalid_asset(
            "bridge fee",
            InvalidAssetReason::ContractMismatch {
                token: token.contract.to_string(),
                fee: fee.contract.to_string(),
            },
        ));
    }

    let mut delta = StateDelta::new(&mut *state);
    let id = delta
        .get_next_transfer_id()
        .await
        .wrap_err("failed to get next transfer id")?;
    let transfer = OutgoingTransfer {
        id,
        sender: request.sender,
        destination: request.destination,
        token,
        fee,
    };
    delta
        .put_pool_transfer(&transfer)
        .wrap_err("failed to put transfer into the pool")?;
    delta
        .put_next_transfer_id(id.checked_add(1).ok_or_eyre("transfer id overflowed")?)
        .wrap_err("failed to put next transfer id")?;
    let count = delta
        .get_unbatched_count()
        .await
        .wrap_err("failed to get unbatched transfer count")?;
    delta
        .put_unbatched_count(
            count
                .checked_add(1)
                .ok_or_eyre("unbatched transfer count overflowed")?,
        )
        .wrap_err("failed to put unbatched transfer count")?;
    delta.record(create_outgoing_transfer_event(&transfer));
    commit(delta);

    debug!(id, fee = transfer.fee.amount, "added transfer to outgoing pool");
    Ok(id)
}

/// Removes up to `max_count` transfers from the pool, highest fee first.
///
/// All picked transfers share the token contract of the first one; pending transfers of other
/// contracts are skipped and stay in the pool. The returned transfers are in pick order.
///
/// This does not stage its writes separately; callers run it inside their own delta.
pub(crate) async fn pick_top<S: StateWrite>(
    state: &mut S,
    max_count: u64,
) -> eyre::Result<Vec<OutgoingTransfer>> {
    let max_count = usize::try_from(max_count).unwrap_or(usize::MAX);
    let mut picked = Vec::new();
    {
        let mut index = std::pin::pin!(state.pool_fee_index());
        let mut token_contract = None;
        while picked.len() < max_count {
            let Some(entry) = index
                .try_next()
                .await
                .wrap_err("failed to read the next fee index entry")?
            else {
                break;
            };
            match token_contract {
                None => token_contract = Some(entry.fee.contract),
                Some(contract) if contract != entry.fee.contract => continue,
                Some(_) => {}
            }
            picked.push(entry);
        }
    }

    let mut transfers = Vec::with_capacity(picked.len());
    for entry in picked {
        let transfer = state
            .get_pool_transfer(entry.id)
            .await
            .wrap_err("failed to get pool transfer")?
            .ok_or_else(|| {
                eyre!(
                    "fee index references transfer {} which has no body; pool state is corrupt",
                    entry.id
                )
            })?;
        state.delete_pool_transfer(entry.id, entry.fee.amount);
        transfers.push(transfer);
    }

    let picked_count = u64::try_from(transfers.len()).wrap_err("picked count exceeds u64")?;
    let count = state
        .get_unbatched_count()
        .await
        .wrap_err("failed to get unbatched transfer count")?;
    let remaining = count.checked_sub(picked_count).ok_or_else(|| {
        eyre!(
            "picked {picked_count} transfers but only {count} were counted as unbatched; pool \
             state is corrupt"
        )
    })?;
    state
        .put_unbatched_count(remaining)
        .wrap_err("failed to put unbatched transfer count")?;
    Ok(transfers)
}

/// Returns a transfer to the pool under its original fee index key, so it keeps its place ahead
/// of newer transfers with the same fee.
///
/// The unbatched count is left to the caller, which knows how many transfers it returns.
pub(crate) fn requeue<S: StateWrite>(state: &mut S, transfer: &OutgoingTransfer) -> eyre::Result<()> {
    state
        .put_pool_transfer(transfer)
        .wrap_err("failed to return transfer to the pool")
}

fn create_outgoing_transfer_event(transfer: &OutgoingTransfer) -> Event {
    Event::new(
        "outgoing_transfer",
        [
            ("id", transfer.id.to_string()).index(),
            ("sender", transfer.sender.display_address().to_string()).index(),
            ("destination", transfer.destination.to_string()).index(),
            ("tokenContract", transfer.token.contract.to_string()).index(),
            ("amount", transfer.token.amount.to_string()).index(),
            ("bridgeFee", transfer.fee.amount.to_string()).index(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use cnidarium::StateDelta;

    use super::*;
    use crate::test_utils::{
        other_token_contract,
        push_transfers,
        receiver,
        token_contract,
        transfer_request,
        SENDER,
    };

    #[tokio::test]
    async fn pushed_transfers_are_ordered_by_fee_then_id() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);

        let ids = push_transfers(&mut state, &[2, 3, 2, 1]).await;
        assert_eq!(ids, vec![1, 2, 3, 4]);

        assert_eq!(state.get_unbatched_count().await.unwrap(), 4);
        let pending = state.get_pending_transfers().await.unwrap();
        let order: Vec<(u64, u128, u128)> = pending
            .iter()
            .map(|transfer| (transfer.id, transfer.fee.amount, transfer.token.amount))
            .collect();
        assert_eq!(
            order,
            vec![(2, 3, 101), (1, 2, 100), (3, 2, 102), (4, 1, 103)]
        );
        assert!(pending.iter().all(|transfer| transfer.sender == SENDER
            && transfer.destination == receiver()
            && transfer.token.contract == token_contract()));
    }

    #[tokio::test]
    async fn invalid_assets_are_rejected_without_writes() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);

        let mut not_a_voucher = transfer_request(100, 1);
        not_a_voucher.amount = Coin::new("uatom", 100);
        let mut bad_fee = transfer_request(100, 1);
        bad_fee.bridge_fee = Coin::new("peggy/0x1234", 1);
        let zero_amount = transfer_request(0, 1);
        let mut mismatched = transfer_request(100, 1);
        mismatched.bridge_fee = Coin::from(&Erc20Token::new(other_token_contract(), 1));

        for request in [not_a_voucher, bad_fee, zero_amount, mismatched] {
            let err = push_to_outgoing_pool(&mut state, request.clone())
                .await
                .expect_err("request must be rejected");
            assert!(
                matches!(err, BridgeError::InvalidAsset { .. }),
                "{request:?} failed with unexpected error: {err:?}"
            );
        }

        assert_eq!(state.get_unbatched_count().await.unwrap(), 0);
        assert_eq!(state.get_next_transfer_id().await.unwrap(), 1);
        assert!(state.get_pending_transfers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_records_an_event() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        let mut state_tx = StateDelta::new(&mut state);

        push_to_outgoing_pool(&mut state_tx, transfer_request(100, 7))
            .await
            .unwrap();
        let events = state_tx.apply().1;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "outgoing_transfer");
        assert!(events[0].attributes.iter().all(|attr| attr.index()));
    }

    #[tokio::test]
    async fn pick_top_respects_max_count_and_order() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        push_transfers(&mut state, &[2, 3, 2, 1]).await;

        let picked = pick_top(&mut state, 2).await.unwrap();
        assert_eq!(
            picked.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![2, 1]
        );
        assert_eq!(state.get_unbatched_count().await.unwrap(), 2);
        assert!(state.get_pool_transfer(2).await.unwrap().is_none());

        let picked = pick_top(&mut state, 5).await.unwrap();
        assert_eq!(
            picked.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![3, 4]
        );
        assert_eq!(state.get_unbatched_count().await.unwrap(), 0);

        assert!(pick_top(&mut state, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pick_top_only_takes_the_leading_token_contract() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        push_transfers(&mut state, &[5, 1]).await;
        let mut other = transfer_request(100, 3);
        other.amount = Coin::from(&Erc20Token::new(other_token_contract(), 100));
        other.bridge_fee = Coin::from(&Erc20Token::new(other_token_contract(), 3));
        let other_id = push_to_outgoing_pool(&mut state, other).await.unwrap();

        let picked = pick_top(&mut state, 10).await.unwrap();
        assert_eq!(
            picked.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(state.get_unbatched_count().await.unwrap(), 1);
        let remaining = state.get_pending_transfers().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, other_id);
    }

    #[tokio::test]
    async fn requeued_transfer_keeps_its_priority() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        push_transfers(&mut state, &[2]).await;

        let picked = pick_top(&mut state, 1).await.unwrap();
        // a newer transfer with the same fee arrives while the first one is batched
        push_transfers(&mut state, &[2]).await;
        requeue(&mut state, &picked[0]).unwrap();

        let pending = state.get_pending_transfers().await.unwrap();
        assert_eq!(
            pending.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[tokio::test]
    async fn fee_index_stream_is_lazy_and_finite() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        push_transfers(&mut state, &[1, 9, 4]).await;

        let mut index = std::pin::pin!(state.pool_fee_index());
        let first = index.try_next().await.unwrap().unwrap();
        assert_eq!(
            first,
            PoolEntry {
                id: 2,
                fee: Erc20Token::new(token_contract(), 9),
            }
        );
        assert_eq!(index.try_next().await.unwrap().unwrap().id, 3);
        assert_eq!(index.try_next().await.unwrap().unwrap().id, 1);
        assert!(index.try_next().await.unwrap().is_none());
    }
}
