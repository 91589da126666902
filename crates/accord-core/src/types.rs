use std::fmt;

use serde::{Deserialize, Serialize};

/// States of one agreement run. Initiator runs walk the whole chain; acceptor
/// runs start at `AwaitingCounterparty` (a candidate was received).
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProtocolState {
    Building,
    LocalValidated,
    LocallySigned,
    AwaitingCounterparty,
    CounterpartyValidated,
    FullySigned,
    Finalizing,
    Finalized,
    Rejected,
}

impl ProtocolState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProtocolState::Finalized | ProtocolState::Rejected)
    }

    /// Legal forward transitions; `Rejected` is reachable from any non-terminal state.
    pub fn can_transition_to(self, next: ProtocolState) -> bool {
        use ProtocolState::*;
        if self.is_terminal() {
            return false;
        }
        if next == Rejected {
            return true;
        }
        matches!(
            (self, next),
            (Building, LocalValidated)
                | (LocalValidated, LocallySigned)
                | (LocallySigned, AwaitingCounterparty)
                | (AwaitingCounterparty, CounterpartyValidated)
                | (CounterpartyValidated, FullySigned)
                | (FullySigned, Finalizing)
                | (Finalizing, Finalized)
        )
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProtocolState::Building => "BUILDING",
            ProtocolState::LocalValidated => "LOCAL_VALIDATED",
            ProtocolState::LocallySigned => "LOCALLY_SIGNED",
            ProtocolState::AwaitingCounterparty => "AWAITING_COUNTERPARTY",
            ProtocolState::CounterpartyValidated => "COUNTERPARTY_VALIDATED",
            ProtocolState::FullySigned => "FULLY_SIGNED",
            ProtocolState::Finalizing => "FINALIZING",
            ProtocolState::Finalized => "FINALIZED",
            ProtocolState::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Acceptor,
}
