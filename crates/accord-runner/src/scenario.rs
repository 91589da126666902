use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use accord_core::{PartyName, ProtocolState, Role, SignedTransaction};
use accord_protocol::{
    AgreementError, CancelToken, FinalityFailure, FinalityService, KeyPairSigner, LocalNetwork, ProgressLog, Signer,
};
use accord_storage::{InMemoryRecordStore, RecordStore};
use accord_validate::ProposalInput;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub scenario_id: String,
    pub network: ScenarioNetwork,
    pub proposal: ScenarioProposal,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioNetwork {
    pub participants: Vec<String>,
    pub notary: String,
    /// Known to the directory but not accepting candidates.
    #[serde(default)]
    pub offline: Vec<String>,
    /// The proposer's finality service refuses every commit.
    #[serde(default)]
    pub finality_down: bool,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioProposal {
    #[serde(rename = "as")]
    pub acting_as: String,
    pub input: ProposalInput,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Finalized,
    InputError,
    RecordError,
    Rejected,
    FinalizationError,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioExpected {
    pub scenario_id: String,
    pub outcome: Outcome,
    #[serde(default)]
    pub message: Option<String>,
    /// Record count per organisation after the run.
    #[serde(default)]
    pub records: BTreeMap<String, usize>,
    #[serde(default)]
    pub initiator_states: Option<Vec<ProtocolState>>,
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub outcome: Outcome,
    /// Error text for failed runs.
    pub message: Option<String>,
    pub records: BTreeMap<String, usize>,
    pub initiator_states: Vec<ProtocolState>,
}

impl ScenarioResult {
    /// Every mismatch against `exp`; empty when the run matched.
    pub fn mismatches(&self, exp: &ScenarioExpected) -> Vec<String> {
        let mut out = vec![];
        if self.outcome != exp.outcome {
            out.push(format!("outcome: expected {:?}, got {:?}", exp.outcome, self.outcome));
        }
        if exp.message.is_some() && self.message != exp.message {
            out.push(format!("message: expected {:?}, got {:?}", exp.message, self.message));
        }
        for (org, want) in &exp.records {
            let got = self.records.get(org).copied().unwrap_or(0);
            if got != *want {
                out.push(format!("records of {org}: expected {want}, got {got}"));
            }
        }
        if let Some(states) = &exp.initiator_states {
            if states != &self.initiator_states {
                out.push(format!(
                    "initiator states: expected {states:?}, got {:?}",
                    self.initiator_states
                ));
            }
        }
        out
    }
}

struct FinalityDown;

impl FinalityService for FinalityDown {
    fn finalize(&self, _stx: &SignedTransaction, _cancel: &CancelToken) -> Result<SignedTransaction, FinalityFailure> {
        Err(FinalityFailure::Unavailable("notary not reachable".to_string()))
    }
}

pub fn load_scenario(dir: &Path) -> Result<Scenario> {
    let p = dir.join("scenario.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read scenario.yaml: {}", p.display()))?;
    let sc: Scenario = serde_yaml::from_str(&s).with_context(|| "parse scenario.yaml")?;
    Ok(sc)
}

pub fn load_expected(dir: &Path) -> Result<ScenarioExpected> {
    let p = dir.join("expected.yaml");
    let s = std::fs::read_to_string(&p).with_context(|| format!("read expected.yaml: {}", p.display()))?;
    let exp: ScenarioExpected = serde_yaml::from_str(&s).with_context(|| "parse expected.yaml")?;
    Ok(exp)
}

/// Runs the scenario's single proposal on a fresh in-memory network with
/// generated keys. Internal protocol errors fail the simulation itself.
pub fn simulate(dir: &Path) -> Result<ScenarioResult> {
    let sc = load_scenario(dir)?;
    let log = Arc::new(ProgressLog::new());
    let mut net = LocalNetwork::new(KeyPairSigner::generate(PartyName::new(&sc.network.notary)))?;
    net.set_observer(log.clone());

    let proposer = PartyName::new(&sc.proposal.acting_as);
    let mut stores: BTreeMap<String, Arc<InMemoryRecordStore>> = BTreeMap::new();
    for raw in &sc.network.participants {
        let name = PartyName::new(raw);
        let signer = KeyPairSigner::generate(name.clone());
        if sc.network.offline.contains(raw) {
            net.directory().register(signer.identity().clone())?;
            continue;
        }
        let store = Arc::new(InMemoryRecordStore::new());
        let org = name.organisation().unwrap_or(raw).to_string();
        stores.insert(org, store.clone());
        if sc.network.finality_down && name == proposer {
            net.join_with_finality(signer, store, Arc::new(FinalityDown))?;
        } else {
            net.join(signer, store)?;
        }
    }

    let node = net
        .node(&proposer)
        .ok_or_else(|| anyhow!("{}: proposer {proposer} is not an online participant", sc.scenario_id))?;
    let (outcome, message) = match node.propose_agreement(sc.proposal.input.clone(), &CancelToken::new()) {
        Ok(_) => (Outcome::Finalized, None),
        Err(AgreementError::Input(e)) => (Outcome::InputError, Some(e.to_string())),
        Err(AgreementError::Record(e)) => (Outcome::RecordError, Some(e.to_string())),
        Err(AgreementError::Rejected(e)) => (Outcome::Rejected, Some(e.to_string())),
        Err(AgreementError::Finalization(e)) => (Outcome::FinalizationError, Some(e.to_string())),
        Err(e @ AgreementError::Internal(_)) => return Err(anyhow!("{}: {e}", sc.scenario_id)),
    };

    let mut records = BTreeMap::new();
    for (org, store) in &stores {
        records.insert(org.clone(), store.query()?.len());
    }
    Ok(ScenarioResult {
        outcome,
        message,
        records,
        initiator_states: log.states(Role::Initiator),
    })
}
