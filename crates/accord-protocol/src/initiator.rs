use std::sync::Arc;

use accord_core::{
    ChangeSet, Party, ProtocolState, Record, RecordFields, Role, RunId, SignedTransaction, Transaction,
};
use accord_validate::RecordValidator;
use tracing::info;

use crate::cancel::CancelToken;
use crate::collaborators::{CounterpartyResponse, FinalityService, Signer, Transport, TransportError};
use crate::crypto::verify_signature;
use crate::error::{AgreementError, FinalizationError, ProtocolRejection};
use crate::progress::{ProgressObserver, ProtocolRun};

/// A committed agreement as seen by the initiator.
#[derive(Clone, Debug)]
pub struct Agreement {
    pub run_id: RunId,
    pub record: Record,
    pub tx: SignedTransaction,
}

/// Initiating side of one agreement run. Borrowed collaborators; one instance per run.
pub struct Initiator<'a> {
    pub signer: &'a dyn Signer,
    pub validator: &'a RecordValidator,
    pub transport: &'a dyn Transport,
    pub finality: &'a dyn FinalityService,
    pub observer: Option<Arc<dyn ProgressObserver>>,
}

impl Initiator<'_> {
    pub fn run(
        &self,
        fields: RecordFields,
        counterparty: Party,
        cancel: &CancelToken,
    ) -> Result<Agreement, AgreementError> {
        let mut run = ProtocolRun::start(Role::Initiator, ProtocolState::Building, self.observer.clone());
        let me = self.signer.identity().clone();

        // BUILDING -> LOCAL_VALIDATED
        let record = Record::new(fields, me, counterparty.clone());
        let change = ChangeSet::create(record.clone());
        if let Err(e) = self.validator.validate(&change) {
            return Err(run.reject(e));
        }
        run.advance(ProtocolState::LocalValidated)?;

        // LOCAL_VALIDATED -> LOCALLY_SIGNED
        let tx = match Transaction::new(change) {
            Ok(tx) => tx,
            Err(e) => return Err(run.reject(AgreementError::Internal(e.to_string()))),
        };
        let mut stx = SignedTransaction::new(tx.clone(), self.signer.sign(&tx));
        run.advance(ProtocolState::LocallySigned)?;

        // LOCALLY_SIGNED -> AWAITING_COUNTERPARTY -> COUNTERPARTY_VALIDATED -> FULLY_SIGNED
        if let Err(i) = cancel.check() {
            return Err(run.reject(ProtocolRejection::from(i)));
        }
        run.advance(ProtocolState::AwaitingCounterparty)?;
        let response = match self.transport.send(&stx, &counterparty, cancel) {
            Ok(r) => r,
            Err(TransportError::Interrupted(i)) => return Err(run.reject(ProtocolRejection::from(i))),
            Err(e) => return Err(run.reject(ProtocolRejection::Unreachable(e.to_string()))),
        };
        let sig = match response {
            CounterpartyResponse::Signed(sig) => sig,
            CounterpartyResponse::Rejected { reason } => {
                return Err(run.reject(ProtocolRejection::CounterpartyRejected {
                    party: counterparty.name.clone(),
                    reason,
                }))
            }
        };
        if sig.by != counterparty.owning_key || !verify_signature(&sig, &tx.id) {
            return Err(run.reject(ProtocolRejection::InvalidCounterpartySignature));
        }
        run.advance(ProtocolState::CounterpartyValidated)?;
        stx.add_signature(sig);
        if !stx.missing_signers().is_empty() {
            return Err(run.reject(ProtocolRejection::InvalidCounterpartySignature));
        }
        run.advance(ProtocolState::FullySigned)?;

        // FULLY_SIGNED -> FINALIZING -> FINALIZED
        if let Err(i) = cancel.check() {
            return Err(run.reject(ProtocolRejection::from(i)));
        }
        run.advance(ProtocolState::Finalizing)?;
        let committed = match self.finality.finalize(&stx, cancel) {
            Ok(c) => c,
            Err(e) => return Err(run.reject(FinalizationError(e))),
        };
        run.advance(ProtocolState::Finalized)?;
        info!(run_id = %run.id, tx_id = %committed.tx.id, record_id = %record.id, "record finalized");

        Ok(Agreement {
            run_id: run.id.clone(),
            record,
            tx: committed,
        })
    }
}
