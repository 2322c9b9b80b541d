use eyre::{
    eyre,
    Result,
    WrapErr as _,
};

use crate::utils::FixedHex;

pub(in crate::pool) const NEXT_TRANSFER_ID: &str = "pool/next_id";
pub(in crate::pool) const UNBATCHED_COUNT: &str = "pool/unbatched_count";
pub(in crate::pool) const TRANSFER_PREFIX: &str = "pool/transfer/";
pub(in crate::pool) const FEE_INDEX_PREFIX: &str = "pool/fee_index/";

pub(in crate::pool) fn transfer(id: u64) -> String {
    format!("{TRANSFER_PREFIX}{}", FixedHex(id))
}

/// The fee index key of a pending transfer.
///
/// The fee is stored inverted so that an ascending prefix scan visits the highest fee first. The
/// id follows the fee so that equal fees are visited in id order, which is insertion order.
pub(in crate::pool) fn fee_index(fee: u128, id: u64) -> String {
    format!(
        "{FEE_INDEX_PREFIX}{}/{}",
        FixedHex(u128::MAX - fee),
        FixedHex(id)
    )
}

pub(in crate::pool) fn extract_id_from_fee_index_key(key: &str) -> Result<u64> {
    let suffix = key
        .strip_prefix(FEE_INDEX_PREFIX)
        .ok_or_else(|| eyre!("key `{key}` did not have prefix `{FEE_INDEX_PREFIX}`"))?;
    let (_fee, id) = suffix
        .split_once('/')
        .ok_or_else(|| eyre!("key `{key}` has no id segment"))?;
    u64::from_str_radix(id, 16)
        .wrap_err_with(|| format!("failed to parse id segment `{id}` of key `{key}`"))
}
