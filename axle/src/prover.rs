//! Client for the external proof oracle.
//!
//! The oracle attests that an event occurred at a given coordinate on a given
//! chain. Proving is asynchronous: submitting a coordinate yields a job id,
//! which is then polled until the job completes or the attempt budget runs
//! out. The proof itself is an opaque blob, base64-encoded over the wire.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{cfg::OracleConfig, error::RelayError, events::EventCoordinate};

#[async_trait]
pub trait ProofOracle: Send + Sync {
    /// Obtain a proof that the event at `coord` occurred. Blocks for up to
    /// the oracle's attempt budget.
    async fn prove(&self, coord: &EventCoordinate) -> Result<Vec<u8>, RelayError>;
}

#[derive(Debug, Serialize)]
struct ProofRequest {
    chain_id: u64,
    block_number: u64,
    tx_index: u64,
    log_index: u64,
}

#[derive(Debug, Deserialize)]
struct JobCreated {
    job_id: u64,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    status: String,
    proof: Option<String>,
}

pub struct HttpProofOracle {
    http: reqwest::Client,
    endpoint: String,
    poll_interval: Duration,
    max_attempts: u32,
}

impl HttpProofOracle {
    pub fn new(config: &OracleConfig) -> Self {
        HttpProofOracle {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts,
        }
    }

    async fn submit(&self, coord: &EventCoordinate) -> Result<u64, RelayError> {
        let request = ProofRequest {
            chain_id: coord.chain_id,
            block_number: coord.block_number,
            tx_index: coord.tx_index,
            log_index: coord.log_index,
        };
        let created: JobCreated = self
            .http
            .post(format!("{}/jobs", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::Oracle(e.to_string()))?
            .error_for_status()
            .map_err(|e| RelayError::Oracle(e.to_string()))?
            .json()
            .await
            .map_err(|e| RelayError::Oracle(e.to_string()))?;

        Ok(created.job_id)
    }

    async fn poll_job(&self, job_id: u64) -> Result<JobStatus, RelayError> {
        self.http
            .get(format!("{}/jobs/{job_id}", self.endpoint))
            .send()
            .await
            .map_err(|e| RelayError::Oracle(e.to_string()))?
            .error_for_status()
            .map_err(|e| RelayError::Oracle(e.to_string()))?
            .json()
            .await
            .map_err(|e| RelayError::Oracle(e.to_string()))
    }
}

#[async_trait]
impl ProofOracle for HttpProofOracle {
    async fn prove(&self, coord: &EventCoordinate) -> Result<Vec<u8>, RelayError> {
        let job_id = self.submit(coord).await?;
        debug!(
            job_id,
            chain_id = coord.chain_id,
            block_number = coord.block_number,
            "proof job submitted"
        );

        for _ in 0..self.max_attempts {
            tokio::time::sleep(self.poll_interval).await;

            let status = self.poll_job(job_id).await?;
            match status.status.as_str() {
                "complete" => {
                    let encoded = status
                        .proof
                        .ok_or_else(|| RelayError::Oracle(format!("job {job_id} completed without a proof")))?;
                    return STANDARD
                        .decode(&encoded)
                        .map_err(|e| RelayError::Oracle(format!("job {job_id}: bad proof encoding: {e}")));
                }
                "failed" | "error" => {
                    return Err(RelayError::Oracle(format!("job {job_id} failed")));
                }
                _ => {}
            }
        }

        Err(RelayError::ProofTimeout {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_parses_with_and_without_proof() {
        let pending: JobStatus = serde_json::from_str(r#"{"status":"pending"}"#).unwrap();
        assert_eq!(pending.status, "pending");
        assert!(pending.proof.is_none());

        let complete: JobStatus =
            serde_json::from_str(r#"{"status":"complete","proof":"3q0="}"#).unwrap();
        assert_eq!(STANDARD.decode(complete.proof.unwrap()).unwrap(), vec![0xde, 0xad]);
    }
}
