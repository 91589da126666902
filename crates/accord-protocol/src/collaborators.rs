use accord_core::{Party, PartyName, Signature, SignedTransaction, Transaction};

use crate::cancel::{CancelToken, Interrupted};

pub trait IdentityResolver: Send + Sync {
    /// `Ok(None)` when the name is unknown; `Err` when the resolver itself failed.
    fn resolve(&self, name: &PartyName) -> anyhow::Result<Option<Party>>;
    /// Every identity known to the resolver, services included.
    fn parties(&self) -> anyhow::Result<Vec<Party>>;
}

pub trait Signer: Send + Sync {
    fn identity(&self) -> &Party;
    fn sign(&self, tx: &Transaction) -> Signature;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CounterpartyResponse {
    Signed(Signature),
    Rejected { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("no route to {0}")]
    Unreachable(PartyName),
    #[error("counterparty session closed: {0}")]
    Disconnected(String),
    #[error("wait for counterparty interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

/// Delivers a locally signed candidate to the counterparty and blocks for its answer.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        candidate: &SignedTransaction,
        to: &Party,
        cancel: &CancelToken,
    ) -> Result<CounterpartyResponse, TransportError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FinalityFailure {
    #[error("transaction id does not match its content")]
    TamperedTransaction,
    #[error("missing signature from {0}")]
    MissingSignature(String),
    #[error("invalid signature from {0}")]
    InvalidSignature(String),
    #[error("no record to commit")]
    NothingToCommit,
    #[error("finality service unavailable: {0}")]
    Unavailable(String),
    #[error("recording committed record failed: {0}")]
    Recording(String),
    #[error("finality wait interrupted: {0}")]
    Interrupted(#[from] Interrupted),
}

/// Commits a fully signed transaction and makes its record visible to every participant.
/// Finalizing an already committed transaction returns the original commit.
pub trait FinalityService: Send + Sync {
    fn finalize(&self, stx: &SignedTransaction, cancel: &CancelToken) -> Result<SignedTransaction, FinalityFailure>;
}
