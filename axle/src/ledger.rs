//! The hub order ledger: an authoritative, replay-safe order lifecycle.
//!
//! Transitions are proof-gated. Every field the ledger stores is decoded from
//! the attested event inside the proof, never from relay-supplied values.
//! Proof authenticity itself is delegated to a [`ProofVerifier`] the ledger
//! trusts unconditionally; this module is purely the state-machine and
//! consistency-check layer. A transition commits only after all checks pass.

use std::{collections::HashMap, sync::Arc};

use alloy::{
    primitives::{Address, B256, Bytes, LogData, U256},
    sol_types::SolEvent,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use crate::{
    contracts::{Confirmation, OrderCompleted, OrderCreated, OrderOpened, ReclaimReady},
    error::{LedgerError, RelayError},
    relay::HubLedger,
};

/// A cross-chain attestation, decoded from an opaque proof blob. The absent
/// state (NONEXISTENT) is represented by absence from the order map.
#[derive(Debug, Clone)]
pub struct Attestation {
    /// Signature hash of the attested event.
    pub signature: B256,
    /// The attested event's topics and data.
    pub data: LogData,
}

/// Verifies the authenticity of a proof blob and extracts the attested event.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, proof: &[u8]) -> Result<Attestation, LedgerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Open,
    Completed,
}

/// Stored order record. Everything except `state`, `confirmation_id` and
/// `timestamp` is immutable once open.
#[derive(Debug, Clone)]
pub struct OrderInfo {
    pub state: OrderState,
    pub source_account: Address,
    pub target_account: B256,
    pub amount: U256,
    pub reward_asset: Address,
    pub confirmation_id: Option<B256>,
    pub timestamp: U256,
    pub nonce: U256,
    pub network_id: U256,
}

#[derive(Debug, Default)]
pub struct OrderLedger<V> {
    verifier: V,
    orders: HashMap<B256, OrderInfo>,
}

impl<V: ProofVerifier> OrderLedger<V> {
    pub fn new(verifier: V) -> Self {
        OrderLedger {
            verifier,
            orders: HashMap::new(),
        }
    }

    /// NONEXISTENT -> OPEN, gated on a creation attestation.
    pub fn open_order(&mut self, proof: &[u8]) -> Result<OrderOpened, LedgerError> {
        let attestation = self.verifier.verify(proof)?;
        if attestation.signature != OrderCreated::SIGNATURE_HASH {
            return Err(LedgerError::WrongEvent {
                expected: OrderCreated::SIGNATURE_HASH,
                got: attestation.signature,
            });
        }
        let event = OrderCreated::decode_log_data(&attestation.data, true)?;

        if self.orders.contains_key(&event.id) {
            return Err(LedgerError::AlreadyExists(event.id));
        }

        self.orders.insert(
            event.id,
            OrderInfo {
                state: OrderState::Open,
                source_account: event.sourceAccount,
                target_account: event.targetAccount,
                amount: event.amount,
                reward_asset: event.rewardAsset,
                confirmation_id: None,
                timestamp: event.orderTimestamp,
                nonce: event.nonce,
                network_id: event.destination,
            },
        );

        Ok(OrderOpened { id: event.id })
    }

    /// OPEN -> COMPLETED, gated on a confirmation attestation whose amount
    /// matches the stored order. COMPLETED is terminal.
    pub fn order_completed(
        &mut self,
        proof: &[u8],
    ) -> Result<(OrderCompleted, ReclaimReady), LedgerError> {
        let attestation = self.verifier.verify(proof)?;
        if attestation.signature != Confirmation::SIGNATURE_HASH {
            return Err(LedgerError::WrongEvent {
                expected: Confirmation::SIGNATURE_HASH,
                got: attestation.signature,
            });
        }
        let event = Confirmation::decode_log_data(&attestation.data, true)?;

        let order = match self.orders.get(&event.id) {
            Some(order) if order.state == OrderState::Open => order,
            _ => return Err(LedgerError::NotOpen(event.id)),
        };
        if order.amount != event.amount {
            return Err(LedgerError::AmountMismatch {
                id: event.id,
                expected: order.amount,
                got: event.amount,
            });
        }

        // All checks passed; commit the transition.
        let order = self.orders.get_mut(&event.id).expect("checked above");
        order.state = OrderState::Completed;
        order.confirmation_id = Some(event.confirmationId);
        order.timestamp = event.timestamp;

        Ok((
            OrderCompleted {
                id: event.id,
                confirmationId: event.confirmationId,
            },
            ReclaimReady {
                id: event.id,
                sourceAccount: order.source_account,
                rewardAsset: order.reward_asset,
            },
        ))
    }

    pub fn is_order_open(&self, id: B256) -> bool {
        self.orders
            .get(&id)
            .is_some_and(|o| o.state == OrderState::Open)
    }

    pub fn is_order_completed(&self, id: B256) -> bool {
        self.orders
            .get(&id)
            .is_some_and(|o| o.state == OrderState::Completed)
    }

    pub fn get_order_info(&self, id: B256) -> Option<OrderInfo> {
        self.orders.get(&id).cloned()
    }
}

/// A [`ProofVerifier`] that trusts the blob verbatim: the proof is a
/// length-prefixed encoding of the attested log's topics and data.
///
/// This stands in for the external verifier contract in embedded and test
/// deployments; it checks structure, not authenticity.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawLogVerifier;

impl RawLogVerifier {
    /// Encode an attested log into the blob format [`RawLogVerifier`] accepts:
    /// one byte topic count, the topics, then the data.
    pub fn encode(topics: &[B256], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + topics.len() * 32 + data.len());
        out.push(topics.len() as u8);
        for topic in topics {
            out.extend_from_slice(topic.as_slice());
        }
        out.extend_from_slice(data);
        out
    }
}

impl ProofVerifier for RawLogVerifier {
    fn verify(&self, proof: &[u8]) -> Result<Attestation, LedgerError> {
        let (&count, rest) = proof
            .split_first()
            .ok_or_else(|| LedgerError::BadProof("empty proof".into()))?;
        let count = count as usize;
        if count == 0 || count > 4 || rest.len() < count * 32 {
            return Err(LedgerError::BadProof("malformed topic section".into()));
        }

        let topics: Vec<B256> = rest[..count * 32]
            .chunks_exact(32)
            .map(B256::from_slice)
            .collect();
        let signature = topics[0];
        let data = LogData::new(topics, Bytes::copy_from_slice(&rest[count * 32..]))
            .ok_or_else(|| LedgerError::BadProof("too many topics".into()))?;

        Ok(Attestation { signature, data })
    }
}

/// An in-process hub: the order ledger mounted directly behind the
/// [`HubLedger`] trait, used by embedded deployments and the integration
/// tests. Ledger rejections map to [`RelayError::Rejected`], exactly as a
/// reverted hub transaction would.
#[derive(Clone)]
pub struct LocalHub<V> {
    ledger: Arc<Mutex<OrderLedger<V>>>,
}

impl<V: ProofVerifier> LocalHub<V> {
    pub fn new(verifier: V) -> Self {
        LocalHub {
            ledger: Arc::new(Mutex::new(OrderLedger::new(verifier))),
        }
    }

    pub fn ledger(&self) -> Arc<Mutex<OrderLedger<V>>> {
        self.ledger.clone()
    }
}

#[async_trait]
impl<V: ProofVerifier> HubLedger for LocalHub<V> {
    async fn open_order(&self, proof: &[u8]) -> Result<(), RelayError> {
        let opened = self
            .ledger
            .lock()
            .open_order(proof)
            .map_err(|e| RelayError::Rejected(e.to_string()))?;
        info!(order_id = %opened.id, "order opened");
        Ok(())
    }

    async fn order_completed(&self, proof: &[u8]) -> Result<(), RelayError> {
        let (completed, reclaim) = self
            .ledger
            .lock()
            .order_completed(proof)
            .map_err(|e| RelayError::Rejected(e.to_string()))?;
        info!(
            order_id = %completed.id,
            confirmation_id = %completed.confirmationId,
            source_account = %reclaim.sourceAccount,
            reward_asset = %reclaim.rewardAsset,
            "order completed, ready to settle"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{confirmation_log, order_created_log};

    fn proof_from_log(log: &alloy::rpc::types::Log) -> Vec<u8> {
        RawLogVerifier::encode(log.inner.data.topics(), &log.inner.data.data)
    }

    fn creation_proof(id: B256, amount: u64) -> Vec<u8> {
        proof_from_log(&order_created_log(id, 84532, U256::from(amount), 1, 0, 0))
    }

    fn confirmation_proof(id: B256, amount: u64) -> Vec<u8> {
        proof_from_log(&confirmation_log(id, U256::from(amount), 2, 0, 0))
    }

    #[test]
    fn open_then_complete() {
        let id = B256::repeat_byte(0xaa);
        let mut ledger = OrderLedger::new(RawLogVerifier);

        let opened = ledger.open_order(&creation_proof(id, 100)).unwrap();
        assert_eq!(opened.id, id);
        assert!(ledger.is_order_open(id));
        assert_eq!(ledger.get_order_info(id).unwrap().amount, U256::from(100u64));

        let (completed, reclaim) = ledger.order_completed(&confirmation_proof(id, 100)).unwrap();
        assert_eq!(completed.id, id);
        assert_eq!(reclaim.sourceAccount, Address::repeat_byte(0x55));
        assert_eq!(reclaim.rewardAsset, Address::repeat_byte(0x44));
        assert!(ledger.is_order_completed(id));
        assert!(!ledger.is_order_open(id));

        let info = ledger.get_order_info(id).unwrap();
        assert_eq!(info.confirmation_id, Some(B256::repeat_byte(0x77)));
        assert_eq!(info.timestamp, U256::from(1_700_000_100u64));
    }

    #[test]
    fn reopening_an_existing_order_rejects() {
        let id = B256::repeat_byte(0xaa);
        let mut ledger = OrderLedger::new(RawLogVerifier);

        ledger.open_order(&creation_proof(id, 100)).unwrap();
        assert!(matches!(
            ledger.open_order(&creation_proof(id, 100)),
            Err(LedgerError::AlreadyExists(_))
        ));

        // Also rejected once completed; the state machine is monotonic.
        ledger.order_completed(&confirmation_proof(id, 100)).unwrap();
        assert!(matches!(
            ledger.open_order(&creation_proof(id, 100)),
            Err(LedgerError::AlreadyExists(_))
        ));
    }

    #[test]
    fn completing_a_nonexistent_or_completed_order_rejects() {
        let id = B256::repeat_byte(0xaa);
        let mut ledger = OrderLedger::new(RawLogVerifier);

        assert!(matches!(
            ledger.order_completed(&confirmation_proof(id, 100)),
            Err(LedgerError::NotOpen(_))
        ));

        ledger.open_order(&creation_proof(id, 100)).unwrap();
        ledger.order_completed(&confirmation_proof(id, 100)).unwrap();
        assert!(matches!(
            ledger.order_completed(&confirmation_proof(id, 100)),
            Err(LedgerError::NotOpen(_))
        ));
    }

    #[test]
    fn amount_mismatch_rejects_without_partial_write() {
        let id = B256::repeat_byte(0xaa);
        let mut ledger = OrderLedger::new(RawLogVerifier);

        ledger.open_order(&creation_proof(id, 100)).unwrap();
        assert!(matches!(
            ledger.order_completed(&confirmation_proof(id, 250)),
            Err(LedgerError::AmountMismatch { .. })
        ));

        // The reject left the order untouched.
        assert!(ledger.is_order_open(id));
        assert!(ledger.get_order_info(id).unwrap().confirmation_id.is_none());
    }

    #[test]
    fn wrong_event_signature_rejects() {
        let id = B256::repeat_byte(0xaa);
        let mut ledger = OrderLedger::new(RawLogVerifier);

        assert!(matches!(
            ledger.open_order(&confirmation_proof(id, 100)),
            Err(LedgerError::WrongEvent { .. })
        ));

        ledger.open_order(&creation_proof(id, 100)).unwrap();
        assert!(matches!(
            ledger.order_completed(&creation_proof(id, 100)),
            Err(LedgerError::WrongEvent { .. })
        ));
    }

    #[test]
    fn garbage_proof_is_rejected() {
        let mut ledger = OrderLedger::new(RawLogVerifier);
        assert!(matches!(
            ledger.open_order(&[]),
            Err(LedgerError::BadProof(_))
        ));
        assert!(matches!(
            ledger.open_order(&[9, 1, 2, 3]),
            Err(LedgerError::BadProof(_))
        ));
    }
}
