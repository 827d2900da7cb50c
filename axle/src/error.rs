use alloy::primitives::{B256, U256};

/// A recoverable fault while talking to a chain RPC endpoint.
///
/// The log source performs no retries itself; the poller's next scheduled
/// tick is the sole retry mechanism for these.
#[derive(Debug, thiserror::Error)]
pub enum ChainFault {
    #[error("rpc transport: {0}")]
    Rpc(String),
    #[error("chain id mismatch: configured {configured}, endpoint reports {reported}")]
    ChainIdMismatch { configured: u64, reported: u64 },
}

/// A raw log that could not be turned into a typed [`crate::events::ChainEvent`].
///
/// Decode failures are diagnostics, never fatal: the poller drops the log and
/// carries on.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("event signature mismatch: expected {expected}, got {got}")]
    SignatureMismatch { expected: B256, got: B256 },
    #[error("unrecognised event signature {0}")]
    UnknownSignature(B256),
    #[error("log is missing its {0}")]
    MissingCoordinate(&'static str),
    #[error("malformed event payload: {0}")]
    Payload(#[from] alloy::sol_types::Error),
}

/// Failure of a single relay attempt.
///
/// `Oracle`, `Transport` and `ProofTimeout` are transient and may be resolved
/// by resubmission. `Rejected` means the hub reverted the invocation; a
/// rejected proof will not be accepted by repeating it, so it is surfaced for
/// investigation instead of retried.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("proof oracle: {0}")]
    Oracle(String),
    #[error("proof job not complete after {attempts} polls")]
    ProofTimeout { attempts: u32 },
    #[error("hub transport: {0}")]
    Transport(String),
    #[error("relay rejected: {0}")]
    Rejected(String),
}

/// Rejection from the hub order ledger. Always a full reject; the ledger
/// never commits a partial transition.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("attestation could not be verified: {0}")]
    BadProof(String),
    #[error("attested event signature mismatch: expected {expected}, got {got}")]
    WrongEvent { expected: B256, got: B256 },
    #[error("malformed attested payload: {0}")]
    Payload(#[from] alloy::sol_types::Error),
    #[error("order {0} already exists")]
    AlreadyExists(B256),
    #[error("order {0} is not open")]
    NotOpen(B256),
    #[error("amount mismatch for order {id}: order holds {expected}, confirmation carries {got}")]
    AmountMismatch { id: B256, expected: U256, got: U256 },
}
