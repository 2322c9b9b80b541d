use crate::utils::FixedHex;

pub(in crate::batch) const LAST_NONCE: &str = "batch/last_nonce";
pub(in crate::batch) const BY_NONCE_PREFIX: &str = "batch/by_nonce/";

pub(in crate::batch) fn by_nonce(nonce: u64) -> String {
    format!("{BY_NONCE_PREFIX}{}", FixedHex(nonce))
}
