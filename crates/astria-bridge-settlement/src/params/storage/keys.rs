pub(in crate::params) const PARAMS: &str = "params";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_should_not_change() {
        insta::assert_snapshot!(PARAMS, @"params");
    }
}
