//! Cross-chain order correlation.
//!
//! Chains share no clock, so creation and confirmation legs are matched
//! purely by logical order key. The pending map is the idempotence boundary
//! for creation replays and the lookup table for confirmations.

use std::collections::{HashMap, HashSet};

use alloy::primitives::{B256, U256};

use crate::{
    contracts::{Confirmation, OrderCreated},
    events::EventCoordinate,
    relay::{RelayJob, RelayKind},
};

/// A creation event seen but not yet confirmed. At most one per order key.
/// Field values stay out of this record on purpose: the hub validates them
/// from the proof, so the correlator only tracks where the creation happened.
#[derive(Debug, Clone)]
pub struct Pending {
    pub source_chain: u64,
    pub coord: EventCoordinate,
}

/// Why an event produced no relay action. All of these are expected
/// operational outcomes, not faults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// The creation's destination is not a chain this deployment relays
    /// toward.
    ForeignDestination(U256),
    /// A second creation event for an order key already pending. The
    /// existing entry is kept, never overwritten.
    DuplicateOrder,
    /// A confirmation with no matching creation; either the creation leg has
    /// not been observed yet or the order already completed.
    OrphanConfirmation,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    Relay(RelayJob),
    Drop(DropReason),
}

#[derive(Debug)]
pub struct Correlator {
    pending: HashMap<B256, Pending>,
    targets: HashSet<u64>,
}

impl Correlator {
    pub fn new(targets: impl IntoIterator<Item = u64>) -> Self {
        Correlator {
            pending: HashMap::new(),
            targets: targets.into_iter().collect(),
        }
    }

    /// Handle a creation event observed on a spoke chain.
    pub fn on_order_created(&mut self, coord: EventCoordinate, event: &OrderCreated) -> Action {
        let destination_matches = u64::try_from(event.destination)
            .is_ok_and(|destination| self.targets.contains(&destination));
        if !destination_matches {
            return Action::Drop(DropReason::ForeignDestination(event.destination));
        }

        if self.pending.contains_key(&event.id) {
            return Action::Drop(DropReason::DuplicateOrder);
        }

        self.pending.insert(
            event.id,
            Pending {
                source_chain: coord.chain_id,
                coord,
            },
        );

        Action::Relay(RelayJob {
            kind: RelayKind::Open,
            order_id: event.id,
            coord,
        })
    }

    /// Handle a confirmation event. The pending entry is *not* removed here:
    /// the caller must call [`Correlator::settle`] once the relay is
    /// accepted, so a transient relay failure leaves the correlation intact.
    pub fn on_confirmation(&self, coord: EventCoordinate, event: &Confirmation) -> Action {
        if !self.pending.contains_key(&event.id) {
            return Action::Drop(DropReason::OrphanConfirmation);
        }

        Action::Relay(RelayJob {
            kind: RelayKind::Complete,
            order_id: event.id,
            coord,
        })
    }

    /// Remove a correlation whose completion relay was accepted. Returns
    /// whether an entry was actually removed.
    pub fn settle(&mut self, order_id: B256) -> bool {
        self.pending.remove(&order_id).is_some()
    }

    pub fn is_pending(&self, order_id: B256) -> bool {
        self.pending.contains_key(&order_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(chain_id: u64, block: u64) -> EventCoordinate {
        EventCoordinate {
            chain_id,
            block_number: block,
            tx_index: 0,
            log_index: 0,
            tx_hash: B256::repeat_byte(0x99),
        }
    }

    fn created(id: B256, destination: u64, amount: u64) -> OrderCreated {
        OrderCreated {
            id,
            destination: U256::from(destination),
            asset: Default::default(),
            targetAccount: Default::default(),
            amount: U256::from(amount),
            rewardAsset: Default::default(),
            insurance: Default::default(),
            maxReward: Default::default(),
            nonce: Default::default(),
            sourceAccount: Default::default(),
            orderTimestamp: Default::default(),
        }
    }

    fn confirmed(id: B256, amount: u64) -> Confirmation {
        Confirmation {
            id,
            target: Default::default(),
            amount: U256::from(amount),
            asset: Default::default(),
            sender: Default::default(),
            confirmationId: B256::repeat_byte(0x77),
            timestamp: Default::default(),
        }
    }

    #[test]
    fn creation_then_confirmation_yields_open_then_complete() {
        let id = B256::repeat_byte(0xaa);
        let mut correlator = Correlator::new([84532]);

        let action = correlator.on_order_created(coord(1, 5), &created(id, 84532, 100));
        let Action::Relay(job) = action else {
            panic!("expected a relay job");
        };
        assert_eq!(job.kind, RelayKind::Open);
        assert!(correlator.is_pending(id));

        let action = correlator.on_confirmation(coord(84532, 9), &confirmed(id, 100));
        let Action::Relay(job) = action else {
            panic!("expected a relay job");
        };
        assert_eq!(job.kind, RelayKind::Complete);

        // Still pending until the relay is accepted.
        assert!(correlator.is_pending(id));
        assert!(correlator.settle(id));
        assert!(!correlator.is_pending(id));
    }

    #[test]
    fn foreign_destination_never_becomes_pending() {
        let id = B256::repeat_byte(0xaa);
        let mut correlator = Correlator::new([84532]);

        let action = correlator.on_order_created(coord(1, 5), &created(id, 10, 100));
        assert_eq!(
            action,
            Action::Drop(DropReason::ForeignDestination(U256::from(10u64)))
        );
        assert_eq!(correlator.pending_count(), 0);
    }

    #[test]
    fn oversized_destination_is_foreign() {
        let id = B256::repeat_byte(0xaa);
        let mut correlator = Correlator::new([84532]);

        let mut event = created(id, 84532, 100);
        event.destination = U256::MAX;
        assert!(matches!(
            correlator.on_order_created(coord(1, 5), &event),
            Action::Drop(DropReason::ForeignDestination(_))
        ));
    }

    #[test]
    fn duplicate_creation_is_dropped_not_overwritten() {
        let id = B256::repeat_byte(0xaa);
        let mut correlator = Correlator::new([84532]);

        assert!(matches!(
            correlator.on_order_created(coord(1, 5), &created(id, 84532, 100)),
            Action::Relay(_)
        ));
        assert_eq!(
            correlator.on_order_created(coord(1, 8), &created(id, 84532, 999)),
            Action::Drop(DropReason::DuplicateOrder)
        );
        assert_eq!(correlator.pending_count(), 1);
    }

    #[test]
    fn orphan_confirmation_is_dropped() {
        let correlator = Correlator::new([84532]);
        let action =
            correlator.on_confirmation(coord(84532, 9), &confirmed(B256::repeat_byte(0xbb), 100));
        assert_eq!(action, Action::Drop(DropReason::OrphanConfirmation));
    }

    #[test]
    fn settle_of_unknown_key_is_a_noop() {
        let mut correlator = Correlator::new([84532]);
        assert!(!correlator.settle(B256::repeat_byte(0xcc)));
    }
}
