use std::sync::Arc;

use accord_core::{Party, Record, RecordFields};
use accord_storage::RecordStore;
use accord_validate::{InputValidationError, ProposalInput, RecordValidator};

use crate::cancel::CancelToken;
use crate::collaborators::{FinalityService, IdentityResolver, Signer, Transport};
use crate::error::AgreementError;
use crate::initiator::{Agreement, Initiator};
use crate::progress::ProgressObserver;

pub struct Collaborators {
    pub resolver: Arc<dyn IdentityResolver>,
    pub transport: Arc<dyn Transport>,
    pub finality: Arc<dyn FinalityService>,
    pub store: Arc<dyn RecordStore>,
}

/// One party's view of the system: propose agreements and read its committed records.
pub struct Node {
    signer: Arc<dyn Signer>,
    validator: RecordValidator,
    collaborators: Collaborators,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl Node {
    pub fn new(
        signer: Arc<dyn Signer>,
        collaborators: Collaborators,
        observer: Option<Arc<dyn ProgressObserver>>,
    ) -> Self {
        Self {
            signer,
            validator: RecordValidator::new(),
            collaborators,
            observer,
        }
    }

    pub fn identity(&self) -> &Party {
        self.signer.identity()
    }

    /// Check and resolve the input, then run the initiator side of the protocol.
    pub fn propose_agreement(&self, input: ProposalInput, cancel: &CancelToken) -> Result<Agreement, AgreementError> {
        let (fields, name) = input.into_parts()?;
        let counterparty = self
            .collaborators
            .resolver
            .resolve(&name)
            .map_err(|e| AgreementError::Internal(format!("resolve {name}: {e:#}")))?
            .ok_or(InputValidationError::PartyNotFound(name))?;
        self.initiator().run(fields, counterparty, cancel)
    }

    pub fn propose(
        &self,
        fields: RecordFields,
        counterparty: &str,
        cancel: &CancelToken,
    ) -> Result<Agreement, AgreementError> {
        self.propose_agreement(ProposalInput::from_fields(fields, counterparty), cancel)
    }

    pub fn list_records(&self) -> anyhow::Result<Vec<Record>> {
        self.collaborators.store.query()
    }

    /// Every other identity the resolver knows about.
    pub fn peers(&self) -> anyhow::Result<Vec<Party>> {
        let me = self.identity();
        Ok(self
            .collaborators
            .resolver
            .parties()?
            .into_iter()
            .filter(|p| p != me)
            .collect())
    }

    fn initiator(&self) -> Initiator<'_> {
        Initiator {
            signer: self.signer.as_ref(),
            validator: &self.validator,
            transport: self.collaborators.transport.as_ref(),
            finality: self.collaborators.finality.as_ref(),
            observer: self.observer.clone(),
        }
    }
}
