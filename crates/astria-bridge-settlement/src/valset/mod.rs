//! Valset snapshots of the bridge validators' external-chain addresses and voting power.
//!
//! The current valset is recomputed from live validator power every block and only stored when
//! it drifted far enough from the latest stored snapshot, or when the snapshot cadence is due.

mod state_ext;
pub(crate) mod storage;

use std::collections::BTreeMap;

use async_trait::async_trait;
use cnidarium::{
    StateDelta,
    StateWrite,
};
use eyre::{
    OptionExt as _,
    WrapErr as _,
};
use serde::Serialize;
pub use state_ext::{
    StateReadExt,
    StateWriteExt,
};
use tendermint::abci::{
    Event,
    EventAttributeIndexExt as _,
};
use tracing::{
    debug,
    info,
    instrument,
    warn,
    Level,
};

use crate::{
    params::Params,
    primitive::{
        EthAddress,
        ADDRESS_LEN,
    },
    registry::StateReadExt as _,
    storage::commit,
    utils::serialize_display,
    BridgeError,
};

/// A validator in the active set together with its voting power.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActiveValidator {
    pub address: [u8; ADDRESS_LEN],
    pub power: u64,
}

/// Source of the active validators and their voting power at the current height.
#[async_trait]
pub trait ValidatorPowerSource: Send + Sync {
    async fn active_validators(&self) -> eyre::Result<Vec<ActiveValidator>>;
}

#[async_trait]
impl ValidatorPowerSource for Vec<ActiveValidator> {
    async fn active_validators(&self) -> eyre::Result<Vec<ActiveValidator>> {
        Ok(self.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValsetMember {
    #[serde(rename = "ethereum_address")]
    pub eth_address: EthAddress,
    #[serde(serialize_with = "serialize_display")]
    pub power: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Valset {
    #[serde(serialize_with = "serialize_display")]
    pub nonce: u64,
    #[serde(serialize_with = "serialize_display")]
    pub height: u64,
    /// Highest power first, lowest address first among equal powers.
    pub members: Vec<ValsetMember>,
}

impl Valset {
    #[must_use]
    pub fn total_power(&self) -> u128 {
        self.members
            .iter()
            .map(|member| u128::from(member.power))
            .sum()
    }
}

/// Maps the active validators to the power of their registered external-chain addresses.
///
/// Validators without a registered address are left out. Validators sharing an address have
/// their power combined, so the total equals the power of all registered active validators.
#[must_use]
pub fn current_membership(
    validators: &[ActiveValidator],
    registrations: &BTreeMap<[u8; ADDRESS_LEN], EthAddress>,
) -> BTreeMap<EthAddress, u64> {
    let mut membership = BTreeMap::new();
    for validator in validators {
        let Some(eth_address) = registrations.get(&validator.address) else {
            continue;
        };
        let power: &mut u64 = membership.entry(*eth_address).or_default();
        *power = power.saturating_add(validator.power);
    }
    membership
}

fn total_power<'a>(powers: impl IntoIterator<Item = &'a u64>) -> u128 {
    powers.into_iter().map(|power| u128::from(*power)).sum()
}

fn canonical_members(membership: &BTreeMap<EthAddress, u64>) -> Vec<ValsetMember> {
    let mut members: Vec<ValsetMember> = membership
        .iter()
        .filter(|(_, power)| **power > 0)
        .map(|(eth_address, power)| ValsetMember {
            eth_address: *eth_address,
            power: *power,
        })
        .collect();
    members.sort_by(|a, b| {
        b.power
            .cmp(&a.power)
            .then_with(|| a.eth_address.cmp(&b.eth_address))
    });
    members
}

/// Computes the current membership from the validator source and the address registry.
///
/// # Errors
///
/// Returns an error if the source or the registry could not be read.
pub async fn compute_current_membership<S, V>(
    state: &S,
    validators: &V,
) -> eyre::Result<BTreeMap<EthAddress, u64>>
where
    S: cnidarium::StateRead + ?Sized,
    V: ValidatorPowerSource + ?Sized,
{
    let registrations = state
        .get_registered_eth_addresses()
        .await
        .wrap_err("failed to get registered eth addresses")?;
    let active = validators
        .active_validators()
        .await
        .wrap_err("failed to get active validators")?;
    Ok(current_membership(&active, &registrations))
}

/// Stores the current valset if its power drifted from the latest snapshot by at least the
/// configured threshold, or if `height` is on the snapshot cadence.
///
/// The latest snapshot's total is taken over its members that are still in the current
/// membership, at their current power. Without a previous snapshot the drift is zero.
///
/// Returns the nonce of the stored valset, or `None` if nothing was stored.
///
/// # Errors
///
/// Returns an error if state or the validator source could not be read or written.
#[instrument(skip_all, fields(%height), err(level = Level::WARN))]
pub async fn maybe_update_valset<S, V>(
    state: &mut S,
    validators: &V,
    height: u64,
    params: &Params,
) -> Result<Option<u64>, BridgeError>
where
    S: StateWrite,
    V: ValidatorPowerSource + ?Sized,
{
    let current = compute_current_membership(&*state, validators).await?;
    let current_power = total_power(current.values());
    if current_power == 0 {
        warn!("no active validator with a registered eth address has power; not storing a valset");
        return Ok(None);
    }

    let latest = state
        .get_latest_valset()
        .await
        .wrap_err("failed to get latest valset")?;
    let latest_power = match &latest {
        None => current_power,
        Some(latest) => total_power(
            latest
                .members
                .iter()
                .filter_map(|member| current.get(&member.eth_address)),
        ),
    };
    let drift = current_power.abs_diff(latest_power);
    let threshold = u128::from(params.valset_change_threshold_percent);
    let drift_exceeded = drift.saturating_mul(100) >= current_power.saturating_mul(threshold);
    let on_cadence = height
        .checked_rem(params.valset_interval)
        .is_some_and(|rem| rem == 0);
    if !drift_exceeded && !on_cadence {
        debug!(%current_power, %drift, "valset unchanged");
        return Ok(None);
    }

    let mut delta = StateDelta::new(&mut *state);
    let nonce = delta
        .get_last_valset_nonce()
        .await
        .wrap_err("failed to get last valset nonce")?
        .checked_add(1)
        .ok_or_eyre("valset nonce overflowed")?;
    let valset = Valset {
        nonce,
        height,
        members: canonical_members(&current),
    };
    delta.put_valset(&valset).wrap_err("failed to put valset")?;
    delta
        .put_last_valset_nonce(nonce)
        .wrap_err("failed to put last valset nonce")?;
    delta.record(create_valset_request_event(&valset));
    commit(delta);

    info!(
        nonce,
        %current_power,
        %drift,
        drift_exceeded,
        on_cadence,
        member_count = valset.members.len(),
        "stored valset"
    );
    Ok(Some(nonce))
}

fn create_valset_request_event(valset: &Valset) -> Event {
    Event::new(
        "valset_request",
        [
            ("nonce", valset.nonce.to_string()).index(),
            ("height", valset.height.to_string()).index(),
            ("memberCount", valset.members.len().to_string()).index(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use cnidarium::StateDelta;

    use super::*;
    use crate::{
        registry::StateWriteExt as _,
        test_utils::{
            register_validators,
            validator,
        },
    };

    fn params(valset_interval: u64, threshold: u64) -> Params {
        Params {
            valset_interval,
            valset_change_threshold_percent: threshold,
            ..Params::default()
        }
    }

    #[test]
    fn membership_excludes_unregistered_validators() {
        let registrations = BTreeMap::from([
            ([1; ADDRESS_LEN], EthAddress::new([0xa1; 20])),
            ([2; ADDRESS_LEN], EthAddress::new([0xa2; 20])),
        ]);
        let validators = [validator(1, 10), validator(2, 20), validator(3, 30)];

        let membership = current_membership(&validators, &registrations);
        assert_eq!(
            membership,
            BTreeMap::from([
                (EthAddress::new([0xa1; 20]), 10),
                (EthAddress::new([0xa2; 20]), 20),
            ])
        );
        assert_eq!(total_power(membership.values()), 30);
    }

    #[test]
    fn members_are_ordered_by_power_then_address() {
        let membership = BTreeMap::from([
            (EthAddress::new([3; 20]), 5),
            (EthAddress::new([1; 20]), 5),
            (EthAddress::new([2; 20]), 9),
        ]);
        let order: Vec<_> = canonical_members(&membership)
            .into_iter()
            .map(|member| (member.eth_address.as_bytes()[0], member.power))
            .collect();
        assert_eq!(order, vec![(2, 9), (1, 5), (3, 5)]);
    }

    #[tokio::test]
    async fn first_snapshot_waits_for_cadence() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        let validators = register_validators(&mut state, &[(1, 60), (2, 40)]);

        assert_eq!(
            maybe_update_valset(&mut state, &validators, 7, &params(10, 5))
                .await
                .unwrap(),
            None
        );
        assert!(state.get_latest_valset().await.unwrap().is_none());

        let nonce = maybe_update_valset(&mut state, &validators, 10, &params(10, 5))
            .await
            .unwrap()
            .expect("height 10 is on cadence");
        assert_eq!(nonce, 1);
        let latest = state.get_latest_valset().await.unwrap().unwrap();
        assert_eq!(latest.height, 10);
        assert_eq!(latest.total_power(), 100);
    }

    #[tokio::test]
    async fn power_drift_over_threshold_triggers_snapshot_off_cadence() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        let validators = register_validators(&mut state, &[(1, 60), (2, 40)]);
        maybe_update_valset(&mut state, &validators, 10, &params(10, 5))
            .await
            .unwrap();

        // a new validator with 10 power: latest total stays 100, current total is 110
        let validators = register_validators(&mut state, &[(1, 60), (2, 40), (3, 10)]);
        let mut state_tx = StateDelta::new(&mut state);
        let nonce = maybe_update_valset(&mut state_tx, &validators, 13, &params(10, 5))
            .await
            .unwrap();
        let events = state_tx.apply().1;
        assert_eq!(nonce, Some(2));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "valset_request");
        assert_eq!(state.get_latest_valset().await.unwrap().unwrap().total_power(), 110);
    }

    #[tokio::test]
    async fn drift_below_threshold_is_ignored() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        let validators = register_validators(&mut state, &[(1, 60), (2, 40)]);
        maybe_update_valset(&mut state, &validators, 10, &params(10, 5))
            .await
            .unwrap();

        // power moves between members: the overlapping members' current power is unchanged
        let validators = register_validators(&mut state, &[(1, 40), (2, 60)]);
        assert_eq!(
            maybe_update_valset(&mut state, &validators, 11, &params(10, 5))
                .await
                .unwrap(),
            None
        );
        // 3 of 103 is below 5 percent
        let validators = register_validators(&mut state, &[(1, 40), (2, 60), (3, 3)]);
        assert_eq!(
            maybe_update_valset(&mut state, &validators, 12, &params(10, 5))
                .await
                .unwrap(),
            None
        );
        assert_eq!(state.get_last_valset_nonce().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn dropped_members_count_as_drift() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        let validators = register_validators(&mut state, &[(1, 50), (2, 50)]);
        maybe_update_valset(&mut state, &validators, 10, &params(10, 5))
            .await
            .unwrap();

        // validator 2 leaves and validator 3 joins with the same power; the latest snapshot's
        // overlapping total is 50 while the current total is 100
        let validators = register_validators(&mut state, &[(1, 50), (3, 50)]);
        assert_eq!(
            maybe_update_valset(&mut state, &validators, 11, &params(10, 5))
                .await
                .unwrap(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn zero_power_skips_update_even_on_cadence() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);
        // active but unregistered
        let validators = vec![validator(9, 100)];
        state
            .put_validator_eth_address(&[1; ADDRESS_LEN], &EthAddress::new([0xa1; 20]))
            .unwrap();

        assert_eq!(
            maybe_update_valset(&mut state, &validators, 10, &params(10, 5))
                .await
                .unwrap(),
            None
        );
        assert_eq!(state.get_last_valset_nonce().await.unwrap(), 0);
    }

    #[test]
    fn valset_serializes_for_relayers() {
        let valset = Valset {
            nonce: 2,
            height: 30,
            members: vec![ValsetMember {
                eth_address: EthAddress::new([0xa1; 20]),
                power: 7,
            }],
        };
        assert_eq!(
            serde_json::to_value(&valset).unwrap(),
            serde_json::json!({
                "nonce": "2",
                "height": "30",
                "members": [{
                    "ethereum_address": format!("0x{}", "a1".repeat(20)),
                    "power": "7",
                }],
            })
        );
    }
}
