use thiserror::Error;

use crate::primitive::ParseVoucherError;

/// Errors surfaced by the settlement operations.
///
/// All variants are recoverable. The block hook logs them and carries on; transaction handlers
/// return them to the submitter.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("invalid {field} asset")]
    InvalidAsset {
        field: &'static str,
        #[source]
        source: InvalidAssetReason,
    },

    #[error("no pending transfers available to build a batch")]
    EmptyPool,

    #[error("no outgoing batch with nonce {nonce}")]
    UnknownBatch { nonce: u64 },

    #[error("no valset with nonce {nonce}")]
    UnknownValset { nonce: u64 },

    #[error("invalid bridge parameters: {0}")]
    InvalidParams(&'static str),

    #[error(transparent)]
    Storage(#[from] eyre::Report),
}

impl BridgeError {
    pub(crate) fn invalid_asset(field: &'static str, source: InvalidAssetReason) -> Self {
        Self::InvalidAsset {
            field,
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum InvalidAssetReason {
    #[error(transparent)]
    NotAVoucher(#[from] ParseVoucherError),

    #[error("amount must not be zero")]
    ZeroAmount,

    #[error("fee contract {fee} does not match token contract {token}")]
    ContractMismatch { token: String, fee: String },
}
