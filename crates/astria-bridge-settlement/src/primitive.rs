use std::{
    fmt::{
        self,
        Display,
        Formatter,
    },
    str::FromStr,
};

use serde::{
    Serialize,
    Serializer,
};

/// Length of a settlement-chain account address (senders and validators).
pub const ADDRESS_LEN: usize = 20;

/// Length of an address on the external EVM chain.
pub const ETH_ADDRESS_LEN: usize = 20;

/// Denom prefix of vouchers minted for bridged ERC-20 tokens.
pub const VOUCHER_DENOM_PREFIX: &str = "peggy";

/// Types that are identified by a settlement-chain account address.
pub trait AddressBytes: Send + Sync {
    fn address_bytes(&self) -> &[u8; ADDRESS_LEN];

    fn display_address(&self) -> impl Display {
        hex::encode(self.address_bytes())
    }
}

impl AddressBytes for [u8; ADDRESS_LEN] {
    fn address_bytes(&self) -> &[u8; ADDRESS_LEN] {
        self
    }
}

impl<T: AddressBytes> AddressBytes for &T {
    fn address_bytes(&self) -> &[u8; ADDRESS_LEN] {
        (*self).address_bytes()
    }
}

/// An address on the external EVM chain.
///
/// Displayed and parsed as `0x` followed by 40 hex characters. Parsing is case
/// insensitive; display is always lowercase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EthAddress([u8; ETH_ADDRESS_LEN]);

impl EthAddress {
    #[must_use]
    pub const fn new(bytes: [u8; ETH_ADDRESS_LEN]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub const fn get(self) -> [u8; ETH_ADDRESS_LEN] {
        self.0
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; ETH_ADDRESS_LEN] {
        &self.0
    }
}

impl Display for EthAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        f.write_str(&hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseEthAddressError {
    #[error("address `{0}` is missing the `0x` prefix")]
    MissingPrefix(String),
    #[error("address `{input}` is not valid hex")]
    Hex {
        input: String,
        source: hex::FromHexError,
    },
}

impl FromStr for EthAddress {
    type Err = ParseEthAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ParseEthAddressError::MissingPrefix(s.to_string()))?;
        let mut bytes = [0u8; ETH_ADDRESS_LEN];
        hex::decode_to_slice(digits, &mut bytes).map_err(|source| ParseEthAddressError::Hex {
            input: s.to_string(),
            source,
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for EthAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// An amount of a specific ERC-20 token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Erc20Token {
    pub contract: EthAddress,
    #[serde(serialize_with = "crate::utils::serialize_display")]
    pub amount: u128,
}

impl Erc20Token {
    #[must_use]
    pub fn new(contract: EthAddress, amount: u128) -> Self {
        Self {
            contract,
            amount,
        }
    }

    /// The voucher denom representing this token on the settlement chain.
    #[must_use]
    pub fn voucher_denom(&self) -> String {
        format!("{VOUCHER_DENOM_PREFIX}/{}", self.contract)
    }
}

/// An amount of a settlement-chain denom, as submitted by a user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    #[must_use]
    pub fn new<T: Into<String>>(denom: T, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

impl From<&Erc20Token> for Coin {
    fn from(token: &Erc20Token) -> Self {
        Self {
            denom: token.voucher_denom(),
            amount: token.amount,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseVoucherError {
    #[error("denom `{0}` is not a `{VOUCHER_DENOM_PREFIX}/<contract>` voucher")]
    NotAVoucher(String),
    #[error("denom `{denom}` does not name a valid contract address")]
    Contract {
        denom: String,
        source: ParseEthAddressError,
    },
}

impl TryFrom<&Coin> for Erc20Token {
    type Error = ParseVoucherError;

    fn try_from(coin: &Coin) -> Result<Self, Self::Error> {
        let contract = coin
            .denom
            .strip_prefix(VOUCHER_DENOM_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| ParseVoucherError::NotAVoucher(coin.denom.clone()))?
            .parse()
            .map_err(|source| ParseVoucherError::Contract {
                denom: coin.denom.clone(),
                source,
            })?;
        Ok(Self {
            contract,
            amount: coin.amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eth_address_display_is_lowercase_and_prefixed() {
        let address: EthAddress = "0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B".parse().unwrap();
        assert_eq!(
            address.to_string(),
            "0xab5801a7d398351b8be11c439e05c5b3259aec9b"
        );
    }

    #[test]
    fn eth_address_rejects_malformed_input() {
        assert!(matches!(
            "ab5801a7d398351b8be11c439e05c5b3259aec9b".parse::<EthAddress>(),
            Err(ParseEthAddressError::MissingPrefix(_))
        ));
        assert!(matches!(
            "0xab58".parse::<EthAddress>(),
            Err(ParseEthAddressError::Hex { .. })
        ));
        assert!(matches!(
            "0xzz5801a7d398351b8be11c439e05c5b3259aec9b".parse::<EthAddress>(),
            Err(ParseEthAddressError::Hex { .. })
        ));
    }

    #[test]
    fn voucher_coin_parses_into_erc20_token() {
        let contract = EthAddress::new([0x42; ETH_ADDRESS_LEN]);
        let token = Erc20Token::new(contract, 101);
        let coin = Coin::from(&token);
        assert_eq!(
            coin.denom,
            "peggy/0x4242424242424242424242424242424242424242"
        );
        assert_eq!(Erc20Token::try_from(&coin).unwrap(), token);
    }

    #[test]
    fn non_voucher_denoms_are_rejected() {
        for denom in ["uatom", "peggy", "peggy0x42", "peggy/not-an-address"] {
            assert!(
                Erc20Token::try_from(&Coin::new(denom, 1)).is_err(),
                "`{denom}` must not parse as a voucher"
            );
        }
    }
}
