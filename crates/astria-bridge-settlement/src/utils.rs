use std::fmt::Display;

use eyre::eyre;
use serde::Serializer;

pub(crate) fn anyhow_to_eyre(anyhow_error: anyhow::Error) -> eyre::Report {
    let boxed: Box<dyn std::error::Error + Send + Sync> = anyhow_error.into();
    eyre!(boxed)
}

/// Serializes a value through its `Display` impl, the way amounts and nonces are rendered for
/// relayers (decimal strings, so that `u128` amounts survive JSON).
pub(crate) fn serialize_display<T: Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Formats a numeric key segment as fixed-width lowercase hex so that the lexicographic order of
/// keys matches the numeric order of the segment.
pub(crate) struct FixedHex<T>(pub(crate) T);

impl std::fmt::Display for FixedHex<u64> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::fmt::Display for FixedHex<u128> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}
