//! In-process collaborators: a shared directory, a thread-per-request
//! transport between acceptors, and a single notary that commits and
//! records finalized transactions for every participant.

use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, RwLock};
use std::thread;
use std::time::Duration;

use accord_core::{Party, PartyKey, PartyName, Record, SignedTransaction, TxId};
use accord_storage::{PutOutcome, RecordStore};
use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::acceptor::Acceptor;
use crate::cancel::CancelToken;
use crate::collaborators::{
    CounterpartyResponse, FinalityFailure, FinalityService, IdentityResolver, Signer, Transport, TransportError,
};
use crate::crypto::{verify_signature, KeyPairSigner};
use crate::node::{Collaborators, Node};
use crate::progress::ProgressObserver;

const POLL: Duration = Duration::from_millis(10);

#[derive(Default)]
pub struct Directory {
    parties: RwLock<BTreeMap<PartyName, Party>>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, party: Party) -> anyhow::Result<()> {
        self.parties
            .write()
            .map_err(|_| anyhow!("directory lock poisoned"))?
            .insert(party.name.clone(), party);
        Ok(())
    }
}

impl IdentityResolver for Directory {
    fn resolve(&self, name: &PartyName) -> anyhow::Result<Option<Party>> {
        let parties = self.parties.read().map_err(|_| anyhow!("directory lock poisoned"))?;
        Ok(parties.get(name).cloned())
    }

    fn parties(&self) -> anyhow::Result<Vec<Party>> {
        let parties = self.parties.read().map_err(|_| anyhow!("directory lock poisoned"))?;
        Ok(parties.values().cloned().collect())
    }
}

/// Routes candidates to registered acceptors by owning key. Each delivery runs
/// on its own thread; the sender waits on a channel and honours its cancel token.
#[derive(Default)]
pub struct LocalTransport {
    routes: RwLock<HashMap<PartyKey, Arc<Acceptor>>>,
    delivery_delay: Option<Duration>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated one-way latency before the acceptor sees a candidate.
    pub fn with_delivery_delay(delay: Duration) -> Self {
        Self {
            routes: RwLock::default(),
            delivery_delay: Some(delay),
        }
    }

    pub fn register(&self, acceptor: Arc<Acceptor>) -> anyhow::Result<()> {
        self.routes
            .write()
            .map_err(|_| anyhow!("route table lock poisoned"))?
            .insert(acceptor.identity().owning_key.clone(), acceptor);
        Ok(())
    }
}

impl Transport for LocalTransport {
    fn send(
        &self,
        candidate: &SignedTransaction,
        to: &Party,
        cancel: &CancelToken,
    ) -> Result<CounterpartyResponse, TransportError> {
        let acceptor = self
            .routes
            .read()
            .map_err(|_| TransportError::Disconnected("route table unavailable".to_string()))?
            .get(&to.owning_key)
            .cloned()
            .ok_or_else(|| TransportError::Unreachable(to.name.clone()))?;

        debug!(tx_id = %candidate.id(), to = %to.name, "delivering candidate");
        let (reply_tx, reply_rx) = mpsc::channel();
        let candidate = candidate.clone();
        let delay = self.delivery_delay;
        thread::spawn(move || {
            if let Some(d) = delay {
                thread::sleep(d);
            }
            let _ = reply_tx.send(acceptor.handle(&candidate));
        });

        loop {
            cancel.check()?;
            let wait = cancel.remaining().map_or(POLL, |r| r.min(POLL));
            match reply_rx.recv_timeout(wait) {
                Ok(resp) => return Ok(resp),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(TransportError::Disconnected(format!("{} dropped the session", to.name)))
                }
            }
        }
    }
}

/// Single notary: checks signatures, commits each transaction once and records
/// the committed record in every participant's store.
pub struct LocalNotary {
    signer: KeyPairSigner,
    stores: RwLock<HashMap<PartyKey, Arc<dyn RecordStore>>>,
    committed: Mutex<HashMap<TxId, SignedTransaction>>,
}

impl LocalNotary {
    pub fn new(signer: KeyPairSigner) -> Self {
        Self {
            signer,
            stores: RwLock::default(),
            committed: Mutex::default(),
        }
    }

    pub fn identity(&self) -> &Party {
        self.signer.identity()
    }

    pub fn register_store(&self, party: PartyKey, store: Arc<dyn RecordStore>) -> anyhow::Result<()> {
        self.stores
            .write()
            .map_err(|_| anyhow!("store table lock poisoned"))?
            .insert(party, store);
        Ok(())
    }

    pub fn is_committed(&self, id: &TxId) -> anyhow::Result<bool> {
        let committed = self.committed.lock().map_err(|_| anyhow!("commit log poisoned"))?;
        Ok(committed.contains_key(id))
    }

    /// Writes `record` to every store, or to none: on a failed write the puts
    /// already made for this transaction are withdrawn.
    fn record_everywhere(record: &Record, stores: &[Arc<dyn RecordStore>]) -> Result<(), FinalityFailure> {
        let mut inserted: Vec<&Arc<dyn RecordStore>> = vec![];
        for store in stores {
            match store.put(record) {
                Ok(PutOutcome::Inserted) => inserted.push(store),
                Ok(PutOutcome::AlreadyPresent) => {}
                Err(e) => {
                    let mut reason = format!("{e:#}");
                    for done in inserted {
                        if let Err(undo) = done.remove(&record.id) {
                            warn!(record_id = %record.id, error = %format!("{undo:#}"), "could not withdraw record");
                            reason.push_str(&format!("; withdrawing {} failed: {undo:#}", record.id));
                        }
                    }
                    return Err(FinalityFailure::Recording(reason));
                }
            }
        }
        Ok(())
    }
}

impl FinalityService for LocalNotary {
    fn finalize(&self, stx: &SignedTransaction, cancel: &CancelToken) -> Result<SignedTransaction, FinalityFailure> {
        cancel.check()?;
        let mut committed = self
            .committed
            .lock()
            .map_err(|_| FinalityFailure::Unavailable("commit log poisoned".to_string()))?;
        if let Some(done) = committed.get(stx.id()) {
            debug!(tx_id = %stx.id(), "transaction already committed");
            return Ok(done.clone());
        }

        let tx = &stx.tx;
        if !tx.id_matches_content() {
            return Err(FinalityFailure::TamperedTransaction);
        }
        for key in &tx.change.signers {
            let sig = stx
                .signatures
                .iter()
                .find(|s| &s.by == key)
                .ok_or_else(|| FinalityFailure::MissingSignature(key.to_string()))?;
            if !verify_signature(sig, &tx.id) {
                return Err(FinalityFailure::InvalidSignature(key.to_string()));
            }
        }
        let record = tx.change.candidate().ok_or(FinalityFailure::NothingToCommit)?;

        let stores = {
            let stores = self
                .stores
                .read()
                .map_err(|_| FinalityFailure::Unavailable("store table poisoned".to_string()))?;
            let found = record
                .participants()
                .into_iter()
                .map(|p| {
                    stores
                        .get(&p.owning_key)
                        .cloned()
                        .ok_or_else(|| FinalityFailure::Unavailable(format!("no record store for {}", p.name)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            found
        };
        Self::record_everywhere(record, &stores)?;

        let mut out = stx.clone();
        out.add_signature(self.signer.sign(tx));
        committed.insert(tx.id.clone(), out.clone());
        info!(tx_id = %tx.id, record_id = %record.id, notary = %self.identity().name, "transaction committed");
        Ok(out)
    }
}

/// A complete network in one process: every joined party gets a node, an
/// acceptor reachable over the shared transport, and a store the notary writes to.
pub struct LocalNetwork {
    directory: Arc<Directory>,
    transport: Arc<LocalTransport>,
    notary: Arc<LocalNotary>,
    nodes: BTreeMap<PartyName, Arc<Node>>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl LocalNetwork {
    pub fn new(notary: KeyPairSigner) -> anyhow::Result<Self> {
        Self::with_transport(notary, LocalTransport::new())
    }

    pub fn with_transport(notary: KeyPairSigner, transport: LocalTransport) -> anyhow::Result<Self> {
        let directory = Arc::new(Directory::new());
        let notary = Arc::new(LocalNotary::new(notary));
        directory.register(notary.identity().clone())?;
        Ok(Self {
            directory,
            transport: Arc::new(transport),
            notary,
            nodes: BTreeMap::new(),
            observer: None,
        })
    }

    /// Observer attached to nodes and acceptors joined after this call.
    pub fn set_observer(&mut self, observer: Arc<dyn ProgressObserver>) {
        self.observer = Some(observer);
    }

    pub fn join(&mut self, signer: KeyPairSigner, store: Arc<dyn RecordStore>) -> anyhow::Result<Arc<Node>> {
        let finality: Arc<dyn FinalityService> = self.notary.clone();
        self.join_with_finality(signer, store, finality)
    }

    /// Join with a node-specific finality service (the notary still records for this party).
    pub fn join_with_finality(
        &mut self,
        signer: KeyPairSigner,
        store: Arc<dyn RecordStore>,
        finality: Arc<dyn FinalityService>,
    ) -> anyhow::Result<Arc<Node>> {
        let signer: Arc<dyn Signer> = Arc::new(signer);
        let party = signer.identity().clone();
        self.directory.register(party.clone())?;
        self.notary.register_store(party.owning_key.clone(), store.clone())?;
        self.transport
            .register(Arc::new(Acceptor::new(signer.clone(), self.observer.clone())))?;

        let node = Arc::new(Node::new(
            signer,
            Collaborators {
                resolver: self.directory.clone(),
                transport: self.transport.clone(),
                finality,
                store,
            },
            self.observer.clone(),
        ));
        self.nodes.insert(party.name.clone(), node.clone());
        Ok(node)
    }

    pub fn node(&self, name: &PartyName) -> Option<Arc<Node>> {
        self.nodes.get(name).cloned()
    }

    pub fn notary(&self) -> &Arc<LocalNotary> {
        &self.notary
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poison<T: Send + Sync + 'static>(lock: Arc<RwLock<T>>) {
        let _ = thread::spawn(move || {
            let _guard = lock.write();
            panic!("writer died holding the lock");
        })
        .join();
    }

    #[test]
    fn poisoned_directory_reports_errors() {
        let parties = Arc::new(RwLock::new(BTreeMap::new()));
        poison(parties.clone());
        let dir = Directory {
            parties: Arc::try_unwrap(parties).unwrap_or_else(|_| panic!("lock still shared")),
        };
        let party = KeyPairSigner::generate(PartyName::new("O=PartyA")).identity().clone();
        assert!(dir.register(party).is_err());
        assert!(dir.resolve(&PartyName::new("O=PartyA")).is_err());
        assert!(dir.parties().is_err());
    }

    #[test]
    fn poisoned_route_table_refuses_registration() {
        let routes = Arc::new(RwLock::new(HashMap::new()));
        poison(routes.clone());
        let transport = LocalTransport {
            routes: Arc::try_unwrap(routes).unwrap_or_else(|_| panic!("lock still shared")),
            delivery_delay: None,
        };
        let signer: Arc<dyn Signer> = Arc::new(KeyPairSigner::generate(PartyName::new("O=PartyB")));
        assert!(transport.register(Arc::new(Acceptor::new(signer, None))).is_err());
    }
}
