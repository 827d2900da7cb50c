//! Read access to a chain's logs and height, behind the [`ChainSource`]
//! trait so pollers can run against mock chains in tests.

use alloy::{
    primitives::{Address, B256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Log},
};
use anyhow::Result;
use async_trait::async_trait;

use crate::error::ChainFault;

/// Per-chain log source.
///
/// Reads are idempotent: calling [`ChainSource::logs_in_range`] repeatedly
/// with overlapping ranges is safe, which is what lets the poller redeliver
/// after a partial failure. Implementations perform no retries; the poller's
/// tick cadence is the retry policy.
#[async_trait]
pub trait ChainSource: Send + Sync {
    async fn current_height(&self) -> Result<u64, ChainFault>;

    async fn logs_in_range(
        &self,
        address: Address,
        topics: Vec<B256>,
        from: u64,
        to: u64,
    ) -> Result<Vec<Log>, ChainFault>;
}

/// A [`ChainSource`] backed by an HTTP JSON-RPC endpoint.
#[derive(Clone)]
pub struct ChainClient {
    pub chain_id: u64,
    pub rpc_url: String,
    provider: DynProvider,
}

impl ChainClient {
    /// Connects and verifies that the endpoint serves the configured chain id.
    pub async fn new(rpc_url: &str, chain_id: u64) -> Result<Self> {
        let url = reqwest::Url::parse(rpc_url)?;
        let provider = ProviderBuilder::new().on_http(url).erased();

        let reported = provider.get_chain_id().await?;
        if reported != chain_id {
            return Err(ChainFault::ChainIdMismatch {
                configured: chain_id,
                reported,
            }
            .into());
        }

        Ok(ChainClient {
            chain_id,
            rpc_url: rpc_url.to_string(),
            provider,
        })
    }
}

#[async_trait]
impl ChainSource for ChainClient {
    async fn current_height(&self) -> Result<u64, ChainFault> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainFault::Rpc(e.to_string()))
    }

    async fn logs_in_range(
        &self,
        address: Address,
        topics: Vec<B256>,
        from: u64,
        to: u64,
    ) -> Result<Vec<Log>, ChainFault> {
        let filter = Filter::new()
            .address(address)
            .event_signature(topics)
            .from_block(from)
            .to_block(to);

        self.provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainFault::Rpc(e.to_string()))
    }
}
