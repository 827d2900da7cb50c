//! Per-chain polling with bounded catch-up and deduplication.
//!
//! The poller turns an at-least-once substrate (re-polling overlapping block
//! ranges) into exactly-once-effective delivery: events are keyed by
//! (transaction id, log index), already-seen ids are suppressed within a
//! height-based retention window, and the watermark only advances once the
//! caller confirms the whole batch was delivered.

use std::collections::{HashSet, VecDeque};

use alloy::primitives::Address;
use tracing::{debug, warn};

use crate::{
    chain_client::ChainSource,
    error::ChainFault,
    events::{self, ChainEvent, EventId, EventKind},
};

/// Poller lifecycle. `CatchingUp` covers the bounded lookback performed on a
/// fresh start; once the watermark has reached the chain tip the poller is
/// `Steady`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    CatchingUp,
    Steady,
}

/// One tick's worth of decoded, ordered, deduplicated events.
///
/// The caller must hand the batch back via [`ChainPoller::commit`] after
/// delivering every event in it. An uncommitted batch leaves the watermark
/// and the seen-set untouched, so the next tick redelivers.
#[derive(Debug)]
pub struct Batch {
    pub events: Vec<ChainEvent>,
    height: u64,
}

/// Bounded set of recently delivered event ids, pruned by block age so the
/// retention window is expressed in the same unit as the catch-up window.
#[derive(Debug, Default)]
struct RecentIds {
    ids: HashSet<EventId>,
    by_height: VecDeque<(u64, EventId)>,
}

impl RecentIds {
    fn contains(&self, id: &EventId) -> bool {
        self.ids.contains(id)
    }

    fn insert(&mut self, height: u64, id: EventId) {
        if self.ids.insert(id) {
            self.by_height.push_back((height, id));
        }
    }

    fn prune_below(&mut self, height: u64) {
        while let Some((h, id)) = self.by_height.front() {
            if *h >= height {
                break;
            }
            self.ids.remove(id);
            self.by_height.pop_front();
        }
    }
}

pub struct ChainPoller<S> {
    source: S,
    chain_id: u64,
    address: Address,
    watch: Vec<EventKind>,
    catchup_window: u64,
    dedup_retention: u64,
    phase: Phase,
    last_polled: u64,
    seen: RecentIds,
}

impl<S: ChainSource> ChainPoller<S> {
    pub fn new(
        source: S,
        chain_id: u64,
        address: Address,
        watch: Vec<EventKind>,
        catchup_window: u64,
        dedup_retention: u64,
    ) -> Self {
        ChainPoller {
            source,
            chain_id,
            address,
            watch,
            catchup_window,
            dedup_retention,
            phase: Phase::Uninitialized,
            last_polled: 0,
            seen: RecentIds::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn last_polled(&self) -> u64 {
        self.last_polled
    }

    /// Fetch, decode, order and deduplicate everything between the watermark
    /// and the chain tip. Returns `None` when there is nothing new.
    ///
    /// Any [`ChainFault`] abandons the tick without moving the watermark; the
    /// next scheduled tick retries the same range.
    pub async fn tick(&mut self) -> Result<Option<Batch>, ChainFault> {
        let height = self.source.current_height().await?;

        if self.phase == Phase::Uninitialized {
            self.last_polled = height.saturating_sub(self.catchup_window);
            self.phase = Phase::CatchingUp;
            debug!(
                chain_id = self.chain_id,
                from = self.last_polled + 1,
                to = height,
                "starting bounded catch-up"
            );
        }

        if height <= self.last_polled {
            self.phase = Phase::Steady;
            return Ok(None);
        }

        let topics = self.watch.iter().map(|k| k.signature_hash()).collect();
        let logs = self
            .source
            .logs_in_range(self.address, topics, self.last_polled + 1, height)
            .await?;

        let mut events = Vec::with_capacity(logs.len());
        let mut in_batch = HashSet::new();
        for log in &logs {
            let Some(kind) = log.topic0().copied().and_then(EventKind::from_signature) else {
                warn!(chain_id = self.chain_id, "dropping log with unrecognised signature");
                continue;
            };
            if !self.watch.contains(&kind) {
                continue;
            }
            match events::decode(self.chain_id, log, kind) {
                Ok(event) => {
                    // Suppress ids delivered in earlier committed batches as
                    // well as repeats of the same id inside this range.
                    let id = event.coord.id();
                    if !self.seen.contains(&id) && in_batch.insert(id) {
                        events.push(event);
                    }
                }
                Err(e) => {
                    warn!(chain_id = self.chain_id, error = %e, "dropping undecodable log");
                }
            }
        }

        // The log source makes no ordering promise across blocks.
        events.sort_by_key(|e| (e.coord.block_number, e.coord.log_index));

        Ok(Some(Batch { events, height }))
    }

    /// Advance the watermark past a fully delivered batch and remember its
    /// event ids for the retention window.
    pub fn commit(&mut self, batch: &Batch) {
        for event in &batch.events {
            self.seen.insert(event.coord.block_number, event.coord.id());
        }
        self.last_polled = batch.height;
        self.phase = Phase::Steady;
        self.seen
            .prune_below(batch.height.saturating_sub(self.dedup_retention));
    }
}
