use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

/// X.500-style legal name, e.g. `O=PartyA,L=London,C=GB`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyName(pub String);

impl PartyName {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of the `O=` attribute, if present.
    pub fn organisation(&self) -> Option<&str> {
        self.0
            .split(',')
            .filter_map(|part| part.trim().split_once('='))
            .find(|(k, _)| k.trim() == "O")
            .map(|(_, v)| v.trim())
    }

    /// Filesystem-friendly name used for per-party key and database files.
    pub fn slug(&self) -> String {
        let base = self.organisation().unwrap_or(&self.0);
        base.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect()
    }
}

impl fmt::Display for PartyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex-encoded ed25519 verifying key owned by a party.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyKey(pub String);

impl PartyKey {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub name: PartyName,
    pub owning_key: PartyKey,
}

impl Party {
    pub fn new(name: PartyName, owning_key: PartyKey) -> Self {
        Self { name, owning_key }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_str())
    }
}

/// Caller-supplied values of a race result, before parties are attached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFields {
    pub challenge_name: String,
    pub challenge_year: i64,
    pub place_city: i64,
    pub place_gender: i64,
    pub bib_number: i64,
    pub first_name: String,
    pub last_name: String,
    pub time: f64,
    pub gender: String,
}

/// A race result agreed between a lender (issuer) and a borrower (approver).
///
/// Records are immutable once built; there is no update path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(flatten)]
    pub fields: RecordFields,
    #[serde(rename = "lenderParty")]
    pub lender: Party,
    #[serde(rename = "borrowerParty")]
    pub borrower: Party,
    pub id: RecordId,
}

impl Record {
    pub fn new(fields: RecordFields, lender: Party, borrower: Party) -> Self {
        Self {
            fields,
            lender,
            borrower,
            id: RecordId::new(),
        }
    }

    pub fn participants(&self) -> [&Party; 2] {
        [&self.lender, &self.borrower]
    }

    pub fn is_participant(&self, key: &PartyKey) -> bool {
        self.participants().iter().any(|p| &p.owning_key == key)
    }

    /// Owning keys of every participant; the complete required signer set.
    pub fn required_signers(&self) -> BTreeSet<PartyKey> {
        self.participants()
            .iter()
            .map(|p| p.owning_key.clone())
            .collect()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.fields;
        write!(
            f,
            "Record(challengeName={}, challengeYear={}, placeCity={}, placeGender={}, bibNumber={}, \
             firstName={}, lastName={}, time={}, gender={}, lender={}, borrower={}, id={})",
            r.challenge_name,
            r.challenge_year,
            r.place_city,
            r.place_gender,
            r.bib_number,
            r.first_name,
            r.last_name,
            r.time,
            r.gender,
            self.lender,
            self.borrower,
            self.id
        )
    }
}
