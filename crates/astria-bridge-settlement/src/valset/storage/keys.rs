use crate::utils::FixedHex;

pub(in crate::valset) const LAST_NONCE: &str = "valset/last_nonce";
pub(in crate::valset) const BY_NONCE_PREFIX: &str = "valset/by_nonce/";

pub(in crate::valset) fn by_nonce(nonce: u64) -> String {
    format!("{BY_NONCE_PREFIX}{}", FixedHex(nonce))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPONENT_PREFIX: &str = "valset/";

    #[test]
    fn keys_should_not_change() {
        insta::assert_snapshot!(LAST_NONCE, @"valset/last_nonce");
        insta::assert_snapshot!(by_nonce(1), @"valset/by_nonce/0000000000000001");
    }

    #[test]
    fn keys_should_have_component_prefix() {
        assert!(LAST_NONCE.starts_with(COMPONENT_PREFIX));
        assert!(by_nonce(1).starts_with(COMPONENT_PREFIX));
    }
}
