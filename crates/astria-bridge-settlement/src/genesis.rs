use serde::{
    Deserialize,
    Serialize,
};

use crate::params::Params;

/// The bridge's part of the chain's genesis.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisState {
    pub params: Params,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_state_parses_from_json() {
        let json = r#"{
            "params": {
                "batch_interval": 5,
                "batch_num": 20,
                "valset_interval": 100,
                "valset_change_threshold_percent": 10
            }
        }"#;
        let genesis: GenesisState = serde_json::from_str(json).unwrap();
        assert_eq!(
            genesis.params,
            Params {
                batch_interval: 5,
                batch_num: 20,
                valset_interval: 100,
                valset_change_threshold_percent: 10,
            }
        );
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(json).unwrap(),
            serde_json::to_value(&genesis).unwrap()
        );
    }
}
