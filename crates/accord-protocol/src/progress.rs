use std::sync::{Arc, Mutex};

use accord_core::{ProtocolState, Role, RunId};
use tracing::{debug, warn};

use crate::error::AgreementError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: ProtocolState,
    pub to: ProtocolState,
    /// Set on transitions into `Rejected`.
    pub reason: Option<String>,
}

pub trait ProgressObserver: Send + Sync {
    fn on_transition(&self, run_id: &RunId, role: Role, transition: &Transition);
}

/// Observer that keeps every transition it sees.
#[derive(Default)]
pub struct ProgressLog {
    entries: Mutex<Vec<(RunId, Role, Transition)>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(RunId, Role, Transition)> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// States visited by `role` runs, starting state first.
    pub fn states(&self, role: Role) -> Vec<ProtocolState> {
        let mut out = vec![];
        for (_, r, t) in self.entries() {
            if r != role {
                continue;
            }
            if out.is_empty() {
                out.push(t.from);
            }
            out.push(t.to);
        }
        out
    }
}

impl ProgressObserver for ProgressLog {
    fn on_transition(&self, run_id: &RunId, role: Role, transition: &Transition) {
        if let Ok(mut e) = self.entries.lock() {
            e.push((run_id.clone(), role, transition.clone()));
        }
    }
}

/// State of one party's run. Only legal transitions are accepted.
pub struct ProtocolRun {
    pub id: RunId,
    pub role: Role,
    state: ProtocolState,
    history: Vec<Transition>,
    observer: Option<Arc<dyn ProgressObserver>>,
}

impl ProtocolRun {
    pub fn start(role: Role, initial: ProtocolState, observer: Option<Arc<dyn ProgressObserver>>) -> Self {
        Self {
            id: RunId::new(),
            role,
            state: initial,
            history: vec![],
            observer,
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    pub fn advance(&mut self, next: ProtocolState) -> Result<(), AgreementError> {
        self.transition(next, None)
    }

    /// Moves to `Rejected` and hands `err` back for propagation.
    pub fn reject<E: Into<AgreementError>>(&mut self, err: E) -> AgreementError {
        let err = err.into();
        if let Err(illegal) = self.reject_with(err.to_string()) {
            return illegal;
        }
        err
    }

    pub fn reject_with(&mut self, reason: String) -> Result<(), AgreementError> {
        warn!(run_id = %self.id, role = ?self.role, state = %self.state, reason = %reason, "run rejected");
        self.transition(ProtocolState::Rejected, Some(reason))
    }

    fn transition(&mut self, next: ProtocolState, reason: Option<String>) -> Result<(), AgreementError> {
        if !self.state.can_transition_to(next) {
            return Err(AgreementError::Internal(format!(
                "illegal transition {} -> {}",
                self.state, next
            )));
        }
        let t = Transition {
            from: self.state,
            to: next,
            reason,
        };
        debug!(run_id = %self.id, role = ?self.role, from = %t.from, to = %t.to, "state transition");
        if let Some(o) = &self.observer {
            o.on_transition(&self.id, self.role, &t);
        }
        self.state = next;
        self.history.push(t);
        Ok(())
    }
}
