use cnidarium::StateWrite;
use tendermint::Time;

use crate::{
    component::BlockContext,
    pool::{
        push_to_outgoing_pool,
        OutgoingTransfer,
        OutgoingTransferRequest,
    },
    primitive::{
        Coin,
        Erc20Token,
        EthAddress,
        ADDRESS_LEN,
    },
    registry::StateWriteExt as _,
    valset::{
        ActiveValidator,
        StateReadExt as _,
        StateWriteExt as _,
        Valset,
        ValsetMember,
    },
};

pub(crate) const SENDER: [u8; ADDRESS_LEN] = [1; ADDRESS_LEN];
pub(crate) const VALIDATOR_A: [u8; ADDRESS_LEN] = [0x0a; ADDRESS_LEN];
pub(crate) const VALIDATOR_B: [u8; ADDRESS_LEN] = [0x0b; ADDRESS_LEN];

pub(crate) fn token_contract() -> EthAddress {
    "0x429881672B9AE42b8EbA0E26cD9C73711b891Ca5".parse().unwrap()
}

pub(crate) fn other_token_contract() -> EthAddress {
    "0x7c2C195CD6D34B8F845992d380aADB2730bB9C6F".parse().unwrap()
}

pub(crate) fn receiver() -> EthAddress {
    "0xd041c41EA1bf0F006ADBb6d2c9ef9D425dE5eaD7".parse().unwrap()
}

pub(crate) fn block_time() -> Time {
    Time::from_unix_timestamp(1_700_000_000, 123).unwrap()
}

pub(crate) fn block(height: u64) -> BlockContext {
    BlockContext {
        height,
        time: block_time(),
    }
}

pub(crate) fn transfer_request(amount: u128, fee: u128) -> OutgoingTransferRequest {
    OutgoingTransferRequest {
        sender: SENDER,
        destination: receiver(),
        amount: Coin::from(&Erc20Token::new(token_contract(), amount)),
        bridge_fee: Coin::from(&Erc20Token::new(token_contract(), fee)),
    }
}

pub(crate) fn outgoing_transfer(id: u64, amount: u128, fee: u128) -> OutgoingTransfer {
    OutgoingTransfer {
        id,
        sender: SENDER,
        destination: receiver(),
        token: Erc20Token::new(token_contract(), amount),
        fee: Erc20Token::new(token_contract(), fee),
    }
}

/// Pushes one transfer per fee, with amounts counting up from 100, and returns their ids.
pub(crate) async fn push_transfers<S: StateWrite>(state: &mut S, fees: &[u128]) -> Vec<u64> {
    let mut ids = Vec::with_capacity(fees.len());
    for (amount, fee) in (100u128..).zip(fees) {
        ids.push(
            push_to_outgoing_pool(state, transfer_request(amount, *fee))
                .await
                .unwrap(),
        );
    }
    ids
}

pub(crate) fn validator(address_byte: u8, power: u64) -> ActiveValidator {
    ActiveValidator {
        address: [address_byte; ADDRESS_LEN],
        power,
    }
}

/// Registers `[byte; 20]` as the eth address of validator `[byte; 20]` and returns the validators
/// with the given power.
pub(crate) fn register_validators<S: StateWrite>(
    state: &mut S,
    validators: &[(u8, u64)],
) -> Vec<ActiveValidator> {
    validators
        .iter()
        .map(|&(byte, power)| {
            state
                .put_validator_eth_address(&[byte; ADDRESS_LEN], &EthAddress::new([byte; 20]))
                .unwrap();
            validator(byte, power)
        })
        .collect()
}

/// Stores a valset of `[byte; 20]` eth addresses under the next valset nonce and returns it.
pub(crate) async fn store_valset<S: StateWrite>(
    state: &mut S,
    height: u64,
    members: &[(u8, u64)],
) -> u64 {
    let nonce = state.get_last_valset_nonce().await.unwrap() + 1;
    let valset = Valset {
        nonce,
        height,
        members: members
            .iter()
            .map(|&(byte, power)| ValsetMember {
                eth_address: EthAddress::new([byte; 20]),
                power,
            })
            .collect(),
    };
    state.put_valset(&valset).unwrap();
    state.put_last_valset_nonce(nonce).unwrap();
    nonce
}
