//! Helpers for constructing raw logs in tests.

use alloy::{
    primitives::{Address, B256, U256},
    rpc::types::Log,
    sol_types::SolEvent,
};

use crate::contracts::{Confirmation, OrderCompleted, OrderCreated, OrderOpened, ReclaimReady};

/// A deterministic transaction hash derived from a log's position, so tests
/// can replay "the same" log without bookkeeping.
pub fn tx_hash(block_number: u64, tx_index: u64) -> B256 {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&block_number.to_be_bytes());
    bytes[8..16].copy_from_slice(&tx_index.to_be_bytes());
    B256::from(bytes)
}

fn raw_log(data: alloy::primitives::LogData, block_number: u64, tx_index: u64, log_index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: Address::repeat_byte(0x11),
            data,
        },
        block_number: Some(block_number),
        transaction_hash: Some(tx_hash(block_number, tx_index)),
        transaction_index: Some(tx_index),
        log_index: Some(log_index),
        ..Default::default()
    }
}

pub fn order_created_log(
    id: B256,
    destination: u64,
    amount: U256,
    block_number: u64,
    tx_index: u64,
    log_index: u64,
) -> Log {
    let event = OrderCreated {
        id,
        destination: U256::from(destination),
        asset: Address::repeat_byte(0x22),
        targetAccount: B256::repeat_byte(0x33),
        amount,
        rewardAsset: Address::repeat_byte(0x44),
        insurance: U256::from(1u64),
        maxReward: U256::from(5u64),
        nonce: U256::from(9u64),
        sourceAccount: Address::repeat_byte(0x55),
        orderTimestamp: U256::from(1_700_000_000u64),
    };
    raw_log(event.encode_log_data(), block_number, tx_index, log_index)
}

pub fn confirmation_log(
    id: B256,
    amount: U256,
    block_number: u64,
    tx_index: u64,
    log_index: u64,
) -> Log {
    let event = Confirmation {
        id,
        target: B256::repeat_byte(0x33),
        amount,
        asset: Address::repeat_byte(0x22),
        sender: Address::repeat_byte(0x66),
        confirmationId: B256::repeat_byte(0x77),
        timestamp: U256::from(1_700_000_100u64),
    };
    raw_log(event.encode_log_data(), block_number, tx_index, log_index)
}

pub fn order_opened_log(id: B256, block_number: u64, tx_index: u64, log_index: u64) -> Log {
    let event = OrderOpened { id };
    raw_log(event.encode_log_data(), block_number, tx_index, log_index)
}

pub fn order_completed_log(id: B256, block_number: u64, tx_index: u64, log_index: u64) -> Log {
    let event = OrderCompleted {
        id,
        confirmationId: B256::repeat_byte(0x77),
    };
    raw_log(event.encode_log_data(), block_number, tx_index, log_index)
}

pub fn reclaim_ready_log(id: B256, block_number: u64, tx_index: u64, log_index: u64) -> Log {
    let event = ReclaimReady {
        id,
        sourceAccount: Address::repeat_byte(0x55),
        rewardAsset: Address::repeat_byte(0x44),
    };
    raw_log(event.encode_log_data(), block_number, tx_index, log_index)
}
