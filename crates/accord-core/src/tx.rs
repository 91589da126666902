use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ids::{RecordId, TxId};
use crate::model::{PartyKey, Record};

/// Descriptor of a proposed ledger change: records consumed, records produced,
/// and the keys whose signatures the change requires.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub consumed: Vec<RecordId>,
    pub produced: Vec<Record>,
    pub signers: BTreeSet<PartyKey>,
}

impl ChangeSet {
    /// Creation of a single record, signed by both of its participants.
    pub fn create(record: Record) -> Self {
        let signers = record.required_signers();
        Self {
            consumed: vec![],
            produced: vec![record],
            signers,
        }
    }

    /// The candidate record, i.e. the first produced record.
    pub fn candidate(&self) -> Option<&Record> {
        self.produced.first()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("encode change set: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub change: ChangeSet,
}

impl Transaction {
    pub fn new(change: ChangeSet) -> Result<Self, EncodeError> {
        let id = Self::digest(&change)?;
        Ok(Self { id, change })
    }

    pub fn canonical_bytes(change: &ChangeSet) -> Result<Vec<u8>, EncodeError> {
        Ok(serde_json::to_vec(change)?)
    }

    pub fn digest(change: &ChangeSet) -> Result<TxId, EncodeError> {
        let bytes = Self::canonical_bytes(change)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(TxId(hex::encode(hasher.finalize())))
    }

    /// True when `id` is the digest of `change` (the content was not altered in transit).
    pub fn id_matches_content(&self) -> bool {
        matches!(Self::digest(&self.change), Ok(id) if id == self.id)
    }
}

/// Signature by `by` over the bytes of a transaction id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub by: PartyKey,
    /// Hex-encoded signature bytes.
    pub bytes: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub tx: Transaction,
    pub signatures: Vec<Signature>,
}

impl SignedTransaction {
    pub fn new(tx: Transaction, first: Signature) -> Self {
        Self {
            tx,
            signatures: vec![first],
        }
    }

    pub fn id(&self) -> &TxId {
        &self.tx.id
    }

    pub fn signed_by(&self, key: &PartyKey) -> bool {
        self.signatures.iter().any(|s| &s.by == key)
    }

    /// Required signers that have not signed yet.
    pub fn missing_signers(&self) -> BTreeSet<PartyKey> {
        self.tx
            .change
            .signers
            .iter()
            .filter(|k| !self.signed_by(k))
            .cloned()
            .collect()
    }

    /// Appends a signature unless that key already signed. Returns whether it was added.
    pub fn add_signature(&mut self, sig: Signature) -> bool {
        if self.signed_by(&sig.by) {
            return false;
        }
        self.signatures.push(sig);
        true
    }
}
