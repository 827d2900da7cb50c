//! Wires pollers, correlator, proof relay and hub ledger into a running
//! relay node.
//!
//! Each chain is polled by its own task; relay calls are spawned per event so
//! a stalled oracle or hub never blocks a poller. The pending-correlation map
//! is the only state shared across tasks and is touched with point operations
//! under a mutex. Shutdown drains nothing: a restart re-derives its watermark
//! through the bounded catch-up window.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{
    cfg::Config,
    chain_client::{ChainClient, ChainSource},
    correlator::{Action, Correlator, DropReason},
    error::RelayError,
    events::{ChainEvent, EventBody, EventKind},
    poller::ChainPoller,
    prover::{HttpProofOracle, ProofOracle},
    relay::{HubContract, HubLedger, ProofRelay, RelayJob, RelayKind},
};

/// Run the relay until interrupted.
pub async fn run(config: Config, signer_key: &str) -> Result<()> {
    config.validate()?;

    let hub = HubContract::new(&config.hub, signer_key)?;
    let oracle = HttpProofOracle::new(&config.oracle);
    let relay = Arc::new(ProofRelay::new(oracle, hub));
    let correlator = Arc::new(Mutex::new(Correlator::new(config.targets.iter().copied())));

    let mut handles = Vec::new();
    for chain in &config.chains {
        let client = ChainClient::new(&chain.rpc_url, chain.chain_id).await?;
        info!(chain_id = chain.chain_id, rpc_url = %chain.rpc_url, "watching spoke order book");
        let poller = ChainPoller::new(
            client,
            chain.chain_id,
            chain.order_book_address,
            vec![EventKind::OrderCreated, EventKind::Confirmation],
            chain.poll.catchup_window,
            chain.poll.dedup_retention,
        );
        handles.push(tokio::spawn(run_spoke_loop(
            poller,
            chain.poll.poll_interval(),
            correlator.clone(),
            relay.clone(),
        )));
    }

    // The hub poller closes the loop: it observes the ledger's own emissions
    // so the relay's actions are confirmed through the same pipeline.
    let hub_client = ChainClient::new(&config.hub.rpc_url, config.hub.chain_id).await?;
    info!(chain_id = config.hub.chain_id, rpc_url = %config.hub.rpc_url, "watching hub order ledger");
    let hub_poller = ChainPoller::new(
        hub_client,
        config.hub.chain_id,
        config.hub.order_ledger_address,
        vec![
            EventKind::OrderOpened,
            EventKind::OrderCompleted,
            EventKind::ReclaimReady,
        ],
        config.hub.poll.catchup_window,
        config.hub.poll.dedup_retention,
    );
    handles.push(tokio::spawn(run_hub_loop(
        hub_poller,
        config.hub.poll.poll_interval(),
    )));

    tokio::signal::ctrl_c().await?;
    info!("shutting down; watermarks will be re-derived via catch-up on restart");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}

async fn run_spoke_loop<S, O, L>(
    mut poller: ChainPoller<S>,
    period: std::time::Duration,
    correlator: Arc<Mutex<Correlator>>,
    relay: Arc<ProofRelay<O, L>>,
) where
    S: ChainSource + 'static,
    O: ProofOracle + 'static,
    L: HubLedger + 'static,
{
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match poller.tick().await {
            Err(e) => warn!(error = %e, "poll tick abandoned"),
            Ok(None) => {}
            Ok(Some(batch)) => {
                for event in &batch.events {
                    handle_spoke_event(event, &correlator, &relay);
                }
                poller.commit(&batch);
            }
        }
    }
}

fn handle_spoke_event<O, L>(
    event: &ChainEvent,
    correlator: &Arc<Mutex<Correlator>>,
    relay: &Arc<ProofRelay<O, L>>,
) where
    O: ProofOracle + 'static,
    L: HubLedger + 'static,
{
    let action = match &event.body {
        EventBody::Created(e) => correlator.lock().on_order_created(event.coord, e),
        EventBody::Confirmed(e) => correlator.lock().on_confirmation(event.coord, e),
        _ => return,
    };

    match action {
        Action::Relay(job) => spawn_relay(job, correlator.clone(), relay.clone()),
        Action::Drop(DropReason::OrphanConfirmation) => {
            // May mean the creation leg failed upstream or is still catching
            // up; operators want to see these.
            info!(
                order_id = %event.order_key(),
                chain_id = event.coord.chain_id,
                "confirmation without a pending creation dropped"
            );
        }
        Action::Drop(DropReason::DuplicateOrder) => {
            debug!(order_id = %event.order_key(), "duplicate creation dropped");
        }
        Action::Drop(DropReason::ForeignDestination(destination)) => {
            debug!(
                order_id = %event.order_key(),
                %destination,
                "creation for a foreign destination dropped"
            );
        }
    }
}

fn spawn_relay<O, L>(job: RelayJob, correlator: Arc<Mutex<Correlator>>, relay: Arc<ProofRelay<O, L>>)
where
    O: ProofOracle + 'static,
    L: HubLedger + 'static,
{
    tokio::spawn(async move {
        match relay.relay(&job).await {
            Ok(()) => {
                // Only a confirmed acceptance removes the correlation; an
                // entry removed earlier would be lost to a transient failure.
                if job.kind == RelayKind::Complete {
                    correlator.lock().settle(job.order_id);
                }
                info!(order_id = %job.order_id, kind = ?job.kind, "relay accepted");
            }
            Err(RelayError::Rejected(reason)) => {
                // Duplicate, stale or malformed proof: repeating it cannot
                // change the outcome. The pending entry stays for corrective
                // resubmission.
                error!(
                    order_id = %job.order_id,
                    kind = ?job.kind,
                    %reason,
                    "relay rejected, requires investigation"
                );
            }
            Err(e) => {
                warn!(order_id = %job.order_id, kind = ?job.kind, error = %e, "relay attempt failed");
            }
        }
    });
}

async fn run_hub_loop<S: ChainSource + 'static>(
    mut poller: ChainPoller<S>,
    period: std::time::Duration,
) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match poller.tick().await {
            Err(e) => warn!(error = %e, "hub poll tick abandoned"),
            Ok(None) => {}
            Ok(Some(batch)) => {
                for event in &batch.events {
                    match &event.body {
                        EventBody::Opened(e) => {
                            info!(order_id = %e.id, "hub ledger opened order");
                        }
                        EventBody::Completed(e) => {
                            info!(
                                order_id = %e.id,
                                confirmation_id = %e.confirmationId,
                                "hub ledger completed order"
                            );
                        }
                        EventBody::ReclaimReady(e) => {
                            info!(
                                order_id = %e.id,
                                source_account = %e.sourceAccount,
                                reward_asset = %e.rewardAsset,
                                "reward reclaimable"
                            );
                        }
                        _ => {}
                    }
                }
                poller.commit(&batch);
            }
        }
    }
}
