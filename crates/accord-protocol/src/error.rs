use accord_core::PartyName;
use accord_validate::{InputValidationError, RecordValidationError};

use crate::cancel::Interrupted;
use crate::collaborators::FinalityFailure;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolRejection {
    #[error("{party} rejected the record: {reason}")]
    CounterpartyRejected { party: PartyName, reason: String },
    #[error("counterparty unreachable: {0}")]
    Unreachable(String),
    #[error("counterparty signature missing or invalid")]
    InvalidCounterpartySignature,
    #[error("run cancelled")]
    Cancelled,
    #[error("run timed out")]
    TimedOut,
}

impl From<Interrupted> for ProtocolRejection {
    fn from(i: Interrupted) -> Self {
        match i {
            Interrupted::Cancelled => ProtocolRejection::Cancelled,
            Interrupted::TimedOut => ProtocolRejection::TimedOut,
        }
    }
}

/// The external commit step failed. The record is not committed; a caller may
/// retry with a fresh proposal.
#[derive(Debug, thiserror::Error)]
#[error("finalization failed: {0}")]
pub struct FinalizationError(#[from] pub FinalityFailure);

#[derive(Debug, thiserror::Error)]
pub enum AgreementError {
    #[error(transparent)]
    Input(#[from] InputValidationError),
    #[error(transparent)]
    Record(#[from] RecordValidationError),
    #[error(transparent)]
    Rejected(#[from] ProtocolRejection),
    #[error(transparent)]
    Finalization(#[from] FinalizationError),
    #[error("internal protocol error: {0}")]
    Internal(String),
}

impl AgreementError {
    /// Input, validation and rejection errors are the caller's or counterparty's
    /// to fix; the others point at infrastructure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AgreementError::Input(_) | AgreementError::Record(_) | AgreementError::Rejected(_)
        )
    }
}
