use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use accord_core::{PartyName, Record};
use accord_protocol::{AgreementError, CancelToken, Node};
use accord_validate::{InputValidationError, ProposalInput};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Status {
    Created,
    BadRequest,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Created => f.write_str("201 Created"),
            Status::BadRequest => f.write_str("400 Bad Request"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiResponse {
    pub status: Status,
    pub body: String,
}

impl ApiResponse {
    fn created(body: String) -> Self {
        Self {
            status: Status::Created,
            body,
        }
    }

    fn bad_request(body: String) -> Self {
        Self {
            status: Status::BadRequest,
            body,
        }
    }
}

/// Front end for one node.
pub struct Api {
    node: Arc<Node>,
    service_names: Vec<String>,
    run_timeout: Option<Duration>,
}

impl Api {
    pub fn new(node: Arc<Node>, service_names: Vec<String>, run_timeout: Option<Duration>) -> Self {
        Self {
            node,
            service_names,
            run_timeout,
        }
    }

    pub fn me(&self) -> &PartyName {
        &self.node.identity().name
    }

    /// Known parties minus ourselves and network services.
    pub fn peers(&self) -> anyhow::Result<Vec<PartyName>> {
        let mine = self.me().organisation();
        Ok(self
            .node
            .peers()?
            .into_iter()
            .map(|p| p.name)
            .filter(|n| {
                let org = n.organisation();
                org != mine && !org.is_some_and(|o| self.service_names.iter().any(|s| s == o))
            })
            .collect())
    }

    pub fn results(&self) -> anyhow::Result<Vec<Record>> {
        self.node.list_records()
    }

    pub fn add_result(&self, input: ProposalInput) -> ApiResponse {
        let cancel = CancelToken::from_timeout(self.run_timeout);
        match self.node.propose_agreement(input, &cancel) {
            Ok(agreement) => {
                ApiResponse::created(format!("Transaction id {} committed to ledger.", agreement.tx.id()))
            }
            Err(AgreementError::Input(InputValidationError::MalformedPartyName(_))) => {
                ApiResponse::bad_request("Query parameter 'partyName' missing or has wrong format.".to_string())
            }
            Err(AgreementError::Input(InputValidationError::PartyNotFound(name))) => {
                ApiResponse::bad_request(format!("Party named {name} cannot be found."))
            }
            Err(e) => {
                if e.is_client_error() {
                    warn!(error = %e, "add-result refused");
                } else {
                    error!(error = %e, "add-result failed");
                }
                ApiResponse::bad_request(e.to_string())
            }
        }
    }
}
