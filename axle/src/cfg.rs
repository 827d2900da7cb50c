use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Result, anyhow};
use serde::Deserialize;

/// Top-level relay configuration, loaded from a TOML file by
/// [`crate::read_config`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The hub chain, where the order ledger lives.
    pub hub: HubConfig,
    /// The spoke chains whose order books are watched.
    pub chains: Vec<SpokeConfig>,
    /// The external proof oracle.
    pub oracle: OracleConfig,
    /// Chain ids this deployment relays toward. A creation event whose
    /// destination is not in this set is dropped by the correlator.
    pub targets: Vec<u64>,
}

impl Config {
    /// Reject configurations that cannot provide the guarantees the relay
    /// depends on.
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(anyhow!("at least one relay target chain id is required"));
        }
        if self.chains.is_empty() {
            return Err(anyhow!("at least one spoke chain is required"));
        }
        for chain in &self.chains {
            chain.poll.validate(chain.chain_id)?;
        }
        self.hub.poll.validate(self.hub.chain_id)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Address of the deployed order ledger contract.
    pub order_ledger_address: Address,
    /// Gas budget for `openOrder` / `orderCompleted` invocations.
    #[serde(default = "gas_budget_default")]
    pub gas_budget: u64,
    #[serde(default)]
    pub poll: PollConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpokeConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// Address of the order book contract emitting `OrderCreated` and
    /// `Confirmation`.
    pub order_book_address: Address,
    #[serde(default)]
    pub poll: PollConfig,
}

/// Polling cadence and catch-up behaviour shared by hub and spoke pollers.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    /// Interval between poll ticks, in milliseconds.
    #[serde(default = "poll_interval_ms_default")]
    pub poll_interval_ms: u64,
    /// How many blocks to look back when the watermark is unset (fresh start
    /// or restart). Events older than this window at restart are permanently
    /// missed; this is an explicit deployment trade-off.
    #[serde(default = "catchup_window_default")]
    pub catchup_window: u64,
    /// How many blocks of seen event ids to retain for deduplication. Must
    /// exceed the catch-up window or redelivered events would slip through.
    #[serde(default = "dedup_retention_default")]
    pub dedup_retention: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            poll_interval_ms: poll_interval_ms_default(),
            catchup_window: catchup_window_default(),
            dedup_retention: dedup_retention_default(),
        }
    }
}

impl PollConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    fn validate(&self, chain_id: u64) -> Result<()> {
        if self.dedup_retention <= self.catchup_window {
            return Err(anyhow!(
                "chain {chain_id}: dedup_retention ({}) must exceed catchup_window ({})",
                self.dedup_retention,
                self.catchup_window,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    /// Base URL of the proof oracle service.
    pub endpoint: String,
    /// Interval between job status polls, in milliseconds.
    #[serde(default = "oracle_poll_interval_ms_default")]
    pub poll_interval_ms: u64,
    /// How many status polls to attempt before giving up on a job.
    #[serde(default = "oracle_max_attempts_default")]
    pub max_attempts: u32,
}

impl OracleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn gas_budget_default() -> u64 {
    1_000_000
}

fn poll_interval_ms_default() -> u64 {
    4_000
}

fn catchup_window_default() -> u64 {
    100
}

fn dedup_retention_default() -> u64 {
    200
}

fn oracle_poll_interval_ms_default() -> u64 {
    1_000
}

fn oracle_max_attempts_default() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = r#"
        targets = [84532]

        [hub]
        rpc_url = "http://localhost:8545"
        chain_id = 84532
        order_ledger_address = "0x00000000000000000000000000000000000000aa"

        [[chains]]
        rpc_url = "http://localhost:8546"
        chain_id = 11155111
        order_book_address = "0x00000000000000000000000000000000000000bb"

        [chains.poll]
        poll_interval_ms = 2000

        [oracle]
        endpoint = "http://localhost:9090"
    "#;

    #[test]
    fn parses_with_defaults() {
        let config: Config = toml::from_str(EXAMPLE).unwrap();
        config.validate().unwrap();

        assert_eq!(config.hub.poll.catchup_window, 100);
        assert_eq!(config.hub.gas_budget, 1_000_000);
        assert_eq!(config.chains[0].poll.poll_interval_ms, 2000);
        assert_eq!(config.oracle.max_attempts, 30);
    }

    #[test]
    fn retention_must_exceed_catchup_window() {
        let mut config: Config = toml::from_str(EXAMPLE).unwrap();
        config.chains[0].poll.dedup_retention = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_target_set_is_rejected() {
        let mut config: Config = toml::from_str(EXAMPLE).unwrap();
        config.targets.clear();
        assert!(config.validate().is_err());
    }
}
