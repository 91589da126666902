use std::fmt;

use accord_core::{PartyKey, PartyName};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RuleCategory {
    /// Shape of the change itself; the first failing structural rule ends validation.
    Structural,
    /// Per-field invariants of the candidate; every failing field is reported.
    Field,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Field {
    ChallengeName,
    ChallengeYear,
    PlaceCity,
    PlaceGender,
    BibNumber,
    FirstName,
    LastName,
    Time,
    Gender,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::ChallengeName => "challengeName",
            Field::ChallengeYear => "challengeYear",
            Field::PlaceCity => "placeCity",
            Field::PlaceGender => "placeGender",
            Field::BibNumber => "bibNumber",
            Field::FirstName => "firstName",
            Field::LastName => "lastName",
            Field::Time => "time",
            Field::Gender => "gender",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One named reason a proposed change is invalid.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
pub enum Violation {
    #[error("no prior record may be consumed")]
    PriorRecordConsumed { count: usize },
    #[error("exactly one new record must be proposed")]
    OutputCount { found: usize },
    #[error("lender and borrower must differ")]
    SameParty,
    #[error("all participants must be signers")]
    MissingSigner { party: PartyName },
    #[error("signers must be exactly the participants")]
    UnexpectedSigner { key: PartyKey },
    #[error("{0} must be non-empty")]
    Blank(Field),
    #[error("{0} must be positive")]
    NotPositive(Field),
}

impl Violation {
    pub fn field(&self) -> Option<Field> {
        match self {
            Violation::Blank(f) | Violation::NotPositive(f) => Some(*f),
            _ => None,
        }
    }
}

/// A candidate failed validation. Holds one structural violation, or every
/// field violation found, in field declaration order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordValidationError {
    violations: Vec<Violation>,
}

impl RecordValidationError {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }

    pub fn contains(&self, v: &Violation) -> bool {
        self.violations.contains(v)
    }
}

impl From<Violation> for RecordValidationError {
    fn from(v: Violation) -> Self {
        Self::new(vec![v])
    }
}

impl fmt::Display for RecordValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RecordValidationError {}
