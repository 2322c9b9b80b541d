use crate::{
    primitive::AddressBytes,
    utils::FixedHex,
};

const BATCH_PREFIX: &str = "confirm/batch/";
const VALSET_PREFIX: &str = "confirm/valset/";

/// Prefix of all confirmations of the batch with `nonce`. The validator follows the prefix so
/// that a scan visits signers in address order.
pub(in crate::confirm) fn batch_prefix(nonce: u64) -> String {
    format!("{BATCH_PREFIX}{}/", FixedHex(nonce))
}

pub(in crate::confirm) fn batch<T: AddressBytes>(nonce: u64, validator: &T) -> String {
    format!("{}{}", batch_prefix(nonce), validator.display_address())
}

pub(in crate::confirm) fn valset_prefix(nonce: u64) -> String {
    format!("{VALSET_PREFIX}{}/", FixedHex(nonce))
}

pub(in crate::confirm) fn valset<T: AddressBytes>(nonce: u64, validator: &T) -> String {
    format!("{}{}", valset_prefix(nonce), validator.display_address())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::ADDRESS_LEN;

    const COMPONENT_PREFIX: &str = "confirm/";
    const VALIDATOR: [u8; ADDRESS_LEN] = [0x0c; ADDRESS_LEN];

    #[test]
    fn keys_should_not_change() {
        insta::assert_snapshot!(
            batch(5, &VALIDATOR),
            @"confirm/batch/0000000000000005/0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c"
        );
        insta::assert_snapshot!(
            valset(17, &VALIDATOR),
            @"confirm/valset/0000000000000011/0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c0c"
        );
    }

    #[test]
    fn keys_should_have_component_prefix() {
        assert!(batch(1, &VALIDATOR).starts_with(COMPONENT_PREFIX));
        assert!(valset(1, &VALIDATOR).starts_with(COMPONENT_PREFIX));
    }

    #[test]
    fn nonce_prefixes_do_not_overlap() {
        // nonce 1 must not pick up confirmations of nonce 16 or 256
        assert!(!batch(16, &VALIDATOR).starts_with(&batch_prefix(1)));
        assert!(!valset(256, &VALIDATOR).starts_with(&valset_prefix(1)));
        assert!(batch(1, &VALIDATOR).starts_with(&batch_prefix(1)));
    }
}
