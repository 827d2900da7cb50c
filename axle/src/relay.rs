//! Drives an observed event through the proof oracle and into the hub
//! ledger.
//!
//! All order content is validated on-chain from the proof itself; the relay
//! submits the proof as the sole argument and holds no authority over field
//! values, so a compromised relay cannot forge or tamper with order content.

use std::str::FromStr;

use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, B256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::{
    cfg::HubConfig,
    contracts::{openOrderCall, orderCompletedCall},
    error::RelayError,
    events::EventCoordinate,
    prover::ProofOracle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayKind {
    /// Relay a creation proof via `openOrder`.
    Open,
    /// Relay a confirmation proof via `orderCompleted`.
    Complete,
}

/// A unit of relay work: one event coordinate bound for one hub method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayJob {
    pub kind: RelayKind,
    pub order_id: B256,
    pub coord: EventCoordinate,
}

/// The hub ledger's state-changing surface, as seen by the relay.
#[async_trait]
pub trait HubLedger: Send + Sync {
    async fn open_order(&self, proof: &[u8]) -> Result<(), RelayError>;
    async fn order_completed(&self, proof: &[u8]) -> Result<(), RelayError>;
}

pub struct ProofRelay<O, L> {
    oracle: O,
    hub: L,
}

impl<O: ProofOracle, L: HubLedger> ProofRelay<O, L> {
    pub fn new(oracle: O, hub: L) -> Self {
        ProofRelay { oracle, hub }
    }

    /// Prove the event and invoke the corresponding hub method.
    ///
    /// A `Rejected` outcome is final for this proof; everything else may be
    /// resolved by resubmission.
    pub async fn relay(&self, job: &RelayJob) -> Result<(), RelayError> {
        let proof = self.oracle.prove(&job.coord).await?;
        debug!(order_id = %job.order_id, proof = %hex::encode(&proof), "proof obtained");

        match job.kind {
            RelayKind::Open => self.hub.open_order(&proof).await,
            RelayKind::Complete => self.hub.order_completed(&proof).await,
        }
    }
}

/// [`HubLedger`] backed by the deployed order ledger contract.
#[derive(Clone)]
pub struct HubContract {
    provider: DynProvider,
    address: Address,
    gas_budget: u64,
}

impl HubContract {
    pub fn new(config: &HubConfig, signer_key: &str) -> Result<Self> {
        let signer = PrivateKeySigner::from_str(signer_key)?;
        let wallet = EthereumWallet::from(signer);
        let url = reqwest::Url::parse(&config.rpc_url)?;
        // The default builder stack already fills gas, nonce and chain id;
        // erasing the provider keeps the filler tower out of our signatures.
        let provider = ProviderBuilder::new().wallet(wallet).on_http(url).erased();

        Ok(HubContract {
            provider,
            address: config.order_ledger_address,
            gas_budget: config.gas_budget,
        })
    }

    async fn submit(&self, calldata: Vec<u8>) -> Result<(), RelayError> {
        let tx = TransactionRequest::default()
            .with_to(self.address)
            .with_gas_limit(self.gas_budget)
            .with_input(calldata);

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        if !receipt.status() {
            return Err(RelayError::Rejected(format!(
                "hub reverted transaction {}",
                receipt.transaction_hash
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl HubLedger for HubContract {
    async fn open_order(&self, proof: &[u8]) -> Result<(), RelayError> {
        let call = openOrderCall {
            proof: proof.to_vec().into(),
        };
        self.submit(call.abi_encode()).await
    }

    async fn order_completed(&self, proof: &[u8]) -> Result<(), RelayError> {
        let call = orderCompletedCall {
            proof: proof.to_vec().into(),
        };
        self.submit(call.abi_encode()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub_config() -> HubConfig {
        HubConfig {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 84532,
            order_ledger_address: Address::repeat_byte(0xaa),
            gas_budget: 500_000,
            poll: Default::default(),
        }
    }

    #[test]
    fn hub_contract_builds_from_config() {
        // Anvil's first well-known development key.
        let key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let contract = HubContract::new(&hub_config(), key).unwrap();
        assert_eq!(contract.address, Address::repeat_byte(0xaa));
        assert_eq!(contract.gas_budget, 500_000);
    }

    #[test]
    fn malformed_signer_key_is_rejected() {
        assert!(HubContract::new(&hub_config(), "not-a-key").is_err());
    }
}
