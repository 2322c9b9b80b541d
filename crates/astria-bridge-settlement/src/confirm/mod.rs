//! Signatures submitted by validators' orchestrators over batches and valsets.
//!
//! Signatures are stored as submitted; verifying them is left to the transaction layer.

mod state_ext;
pub(crate) mod storage;

use cnidarium::StateWrite;
use eyre::WrapErr as _;
use serde::Serialize;
pub use state_ext::{
    StateReadExt,
    StateWriteExt,
};
use tracing::{
    debug,
    instrument,
    Level,
};

use crate::{
    batch::StateReadExt as _,
    primitive::{
        AddressBytes as _,
        EthAddress,
        ADDRESS_LEN,
    },
    utils::serialize_display,
    valset::StateReadExt as _,
    BridgeError,
};

/// A validator's signature over an outgoing batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchConfirmation {
    #[serde(serialize_with = "serialize_display")]
    pub nonce: u64,
    pub token_contract: EthAddress,
    #[serde(serialize_with = "serialize_hex")]
    pub validator: [u8; ADDRESS_LEN],
    pub eth_signer: EthAddress,
    #[serde(serialize_with = "serialize_hex")]
    pub signature: Vec<u8>,
}

/// A validator's signature over a valset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValsetConfirmation {
    #[serde(serialize_with = "serialize_display")]
    pub nonce: u64,
    #[serde(serialize_with = "serialize_hex")]
    pub validator: [u8; ADDRESS_LEN],
    pub eth_address: EthAddress,
    #[serde(serialize_with = "serialize_hex")]
    pub signature: Vec<u8>,
}

fn serialize_hex<T: AsRef<[u8]>, S: serde::Serializer>(
    bytes: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

/// Stores a validator's signature over the outstanding batch `confirmation.nonce`, replacing an
/// earlier one by the same validator.
///
/// # Errors
///
/// Returns [`BridgeError::UnknownBatch`] if there is no outstanding batch with that nonce for
/// the confirmation's token contract.
#[instrument(skip_all, fields(
    nonce = confirmation.nonce,
    validator = %confirmation.validator.display_address()
), err(level = Level::DEBUG))]
pub async fn confirm_batch<S: StateWrite>(
    state: &mut S,
    confirmation: BatchConfirmation,
) -> Result<(), BridgeError> {
    let batch = state
        .get_batch(confirmation.nonce)
        .await
        .wrap_err("failed to get outgoing batch")?;
    if !batch.is_some_and(|batch| batch.token_contract == confirmation.token_contract) {
        return Err(BridgeError::UnknownBatch {
            nonce: confirmation.nonce,
        });
    }
    state
        .put_batch_confirmation(&confirmation)
        .wrap_err("failed to put batch confirmation")?;
    debug!("stored batch confirmation");
    Ok(())
}

/// Stores a validator's signature over the valset `confirmation.nonce`, replacing an earlier one
/// by the same validator.
///
/// # Errors
///
/// Returns [`BridgeError::UnknownValset`] if no valset with that nonce was stored.
#[instrument(skip_all, fields(
    nonce = confirmation.nonce,
    validator = %confirmation.validator.display_address()
), err(level = Level::DEBUG))]
pub async fn confirm_valset<S: StateWrite>(
    state: &mut S,
    confirmation: ValsetConfirmation,
) -> Result<(), BridgeError> {
    if state
        .get_valset(confirmation.nonce)
        .await
        .wrap_err("failed to get valset")?
        .is_none()
    {
        return Err(BridgeError::UnknownValset {
            nonce: confirmation.nonce,
        });
    }
    state
        .put_valset_confirmation(&confirmation)
        .wrap_err("failed to put valset confirmation")?;
    debug!("stored valset confirmation");
    Ok(())
}
