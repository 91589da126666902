use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use accord_core::{Party, ProtocolState, Role, SignedTransaction, TxId};
use accord_validate::RecordValidator;
use tracing::info;

use crate::collaborators::{CounterpartyResponse, Signer};
use crate::crypto::verify_signature;
use crate::progress::{ProgressObserver, ProtocolRun};

pub const DEFAULT_SIGNED_CAPACITY: usize = 10_000;

/// Ids of the most recently signed transactions, oldest evicted first.
struct SignedLedger {
    ids: HashSet<TxId>,
    order: VecDeque<TxId>,
    capacity: usize,
}

impl SignedLedger {
    fn new(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// False when `id` is already remembered.
    fn insert(&mut self, id: &TxId) -> bool {
        if !self.ids.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id.clone());
        while self.order.len() > self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.ids.remove(&old);
            }
        }
        true
    }
}

/// Counterparty side of an agreement. Trusts nothing in the received candidate:
/// re-checks its integrity, the initiator's signature and every record rule
/// before producing at most one signature per transaction.
///
/// Only the last `capacity` signed transaction ids are remembered. An evicted
/// transaction could be counter-signed again; the notary still commits each
/// transaction id once.
pub struct Acceptor {
    signer: Arc<dyn Signer>,
    validator: RecordValidator,
    signed: Mutex<SignedLedger>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl Acceptor {
    pub fn new(signer: Arc<dyn Signer>, observer: Option<Arc<dyn ProgressObserver>>) -> Self {
        Self::with_capacity(signer, observer, DEFAULT_SIGNED_CAPACITY)
    }

    pub fn with_capacity(
        signer: Arc<dyn Signer>,
        observer: Option<Arc<dyn ProgressObserver>>,
        capacity: usize,
    ) -> Self {
        Self {
            signer,
            validator: RecordValidator::new(),
            signed: Mutex::new(SignedLedger::new(capacity)),
            observer,
        }
    }

    pub fn identity(&self) -> &Party {
        self.signer.identity()
    }

    pub fn handle(&self, candidate: &SignedTransaction) -> CounterpartyResponse {
        let mut run = ProtocolRun::start(Role::Acceptor, ProtocolState::AwaitingCounterparty, self.observer.clone());
        match self.check_and_sign(&mut run, candidate) {
            Ok(resp) => resp,
            Err(reason) => {
                // A failed bookkeeping transition must not turn a refusal into a signature.
                let _ = run.reject_with(reason.clone());
                CounterpartyResponse::Rejected { reason }
            }
        }
    }

    fn check_and_sign(
        &self,
        run: &mut ProtocolRun,
        candidate: &SignedTransaction,
    ) -> Result<CounterpartyResponse, String> {
        let me = self.signer.identity();
        let tx = &candidate.tx;

        if !tx.id_matches_content() {
            return Err("transaction id does not match its content".to_string());
        }
        let Some(record) = tx.change.candidate() else {
            return Err("this must be a record creation".to_string());
        };
        if record.borrower.owning_key != me.owning_key {
            return Err("record does not name us as borrower".to_string());
        }
        let initiator_signed = candidate
            .signatures
            .iter()
            .any(|s| s.by == record.lender.owning_key && verify_signature(s, &tx.id));
        if !initiator_signed {
            return Err("initiator signature missing or invalid".to_string());
        }

        self.validator.validate(&tx.change).map_err(|e| e.to_string())?;
        run.advance(ProtocolState::CounterpartyValidated).map_err(|e| e.to_string())?;

        {
            let mut signed = self
                .signed
                .lock()
                .map_err(|_| "signature ledger unavailable".to_string())?;
            if !signed.insert(&tx.id) {
                return Err("already signed".to_string());
            }
        }
        let sig = self.signer.sign(tx);
        run.advance(ProtocolState::FullySigned).map_err(|e| e.to_string())?;
        info!(run_id = %run.id, tx_id = %tx.id, record_id = %record.id, "counter-signed record");
        Ok(CounterpartyResponse::Signed(sig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TxId {
        TxId::from_str(s)
    }

    #[test]
    fn ledger_refuses_repeats_and_evicts_oldest() {
        let mut ledger = SignedLedger::new(2);
        assert!(ledger.insert(&id("a")));
        assert!(!ledger.insert(&id("a")));
        assert!(ledger.insert(&id("b")));
        assert!(ledger.insert(&id("c")));
        assert_eq!(ledger.ids.len(), 2);
        assert_eq!(ledger.order.len(), 2);
        // "a" was evicted, "c" is still remembered
        assert!(ledger.insert(&id("a")));
        assert!(!ledger.insert(&id("c")));
    }

    #[test]
    fn zero_capacity_still_remembers_the_latest() {
        let mut ledger = SignedLedger::new(0);
        assert!(ledger.insert(&id("a")));
        assert!(!ledger.insert(&id("a")));
    }
}
