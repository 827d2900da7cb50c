//! Typed domain events decoded from raw chain logs.
//!
//! Decoding is signature-checked and exhaustive: a log whose topic-0 does not
//! match the expected event kind is a [`DecodeError::SignatureMismatch`],
//! never a panic and never a partially-populated event.

use alloy::{primitives::B256, rpc::types::Log, sol_types::SolEvent};

use crate::{
    contracts::{Confirmation, OrderCompleted, OrderCreated, OrderOpened, ReclaimReady},
    error::DecodeError,
};

/// The event kinds the relay understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OrderCreated,
    Confirmation,
    OrderOpened,
    OrderCompleted,
    ReclaimReady,
}

impl EventKind {
    pub fn signature_hash(self) -> B256 {
        match self {
            EventKind::OrderCreated => OrderCreated::SIGNATURE_HASH,
            EventKind::Confirmation => Confirmation::SIGNATURE_HASH,
            EventKind::OrderOpened => OrderOpened::SIGNATURE_HASH,
            EventKind::OrderCompleted => OrderCompleted::SIGNATURE_HASH,
            EventKind::ReclaimReady => ReclaimReady::SIGNATURE_HASH,
        }
    }

    pub fn from_signature(topic0: B256) -> Option<Self> {
        [
            EventKind::OrderCreated,
            EventKind::Confirmation,
            EventKind::OrderOpened,
            EventKind::OrderCompleted,
            EventKind::ReclaimReady,
        ]
        .into_iter()
        .find(|kind| kind.signature_hash() == topic0)
    }
}

/// Where on a chain an event occurred. This is the coordinate submitted to
/// the proof oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCoordinate {
    pub chain_id: u64,
    pub block_number: u64,
    pub tx_index: u64,
    pub log_index: u64,
    pub tx_hash: B256,
}

impl EventCoordinate {
    /// Uniqueness key used for deduplication. Includes the log index so that
    /// multi-event transactions are not collapsed into one.
    pub fn id(&self) -> EventId {
        EventId {
            chain_id: self.chain_id,
            tx_hash: self.tx_hash,
            log_index: self.log_index,
        }
    }
}

/// Dedup key of an observed event: (chain id, transaction id, log index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    pub chain_id: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

/// Decoded, kind-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventBody {
    Created(OrderCreated),
    Confirmed(Confirmation),
    Opened(OrderOpened),
    Completed(OrderCompleted),
    ReclaimReady(ReclaimReady),
}

/// Immutable record of an observed event. Never mutated after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEvent {
    pub coord: EventCoordinate,
    pub body: EventBody,
}

impl ChainEvent {
    pub fn kind(&self) -> EventKind {
        match self.body {
            EventBody::Created(_) => EventKind::OrderCreated,
            EventBody::Confirmed(_) => EventKind::Confirmation,
            EventBody::Opened(_) => EventKind::OrderOpened,
            EventBody::Completed(_) => EventKind::OrderCompleted,
            EventBody::ReclaimReady(_) => EventKind::ReclaimReady,
        }
    }

    /// The logical order key this event refers to.
    pub fn order_key(&self) -> B256 {
        match &self.body {
            EventBody::Created(e) => e.id,
            EventBody::Confirmed(e) => e.id,
            EventBody::Opened(e) => e.id,
            EventBody::Completed(e) => e.id,
            EventBody::ReclaimReady(e) => e.id,
        }
    }
}

/// Decode a raw log into a typed [`ChainEvent`], insisting that its topic-0
/// matches `expected`.
pub fn decode(chain_id: u64, log: &Log, expected: EventKind) -> Result<ChainEvent, DecodeError> {
    let topic0 = *log.topic0().ok_or(DecodeError::MissingCoordinate("topic0"))?;
    if topic0 != expected.signature_hash() {
        return Err(DecodeError::SignatureMismatch {
            expected: expected.signature_hash(),
            got: topic0,
        });
    }

    let coord = EventCoordinate {
        chain_id,
        block_number: log
            .block_number
            .ok_or(DecodeError::MissingCoordinate("block number"))?,
        tx_index: log
            .transaction_index
            .ok_or(DecodeError::MissingCoordinate("transaction index"))?,
        log_index: log
            .log_index
            .ok_or(DecodeError::MissingCoordinate("log index"))?,
        tx_hash: log
            .transaction_hash
            .ok_or(DecodeError::MissingCoordinate("transaction hash"))?,
    };

    let data = &log.inner.data;
    let body = match expected {
        EventKind::OrderCreated => EventBody::Created(OrderCreated::decode_log_data(data, true)?),
        EventKind::Confirmation => EventBody::Confirmed(Confirmation::decode_log_data(data, true)?),
        EventKind::OrderOpened => EventBody::Opened(OrderOpened::decode_log_data(data, true)?),
        EventKind::OrderCompleted => {
            EventBody::Completed(OrderCompleted::decode_log_data(data, true)?)
        }
        EventKind::ReclaimReady => {
            EventBody::ReclaimReady(ReclaimReady::decode_log_data(data, true)?)
        }
    };

    Ok(ChainEvent { coord, body })
}
