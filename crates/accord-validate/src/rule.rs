use accord_core::{ChangeSet, Record};

use crate::types::{Field, RuleCategory, Violation};

pub trait Rule: Send + Sync {
    fn id(&self) -> &str;
    fn category(&self) -> RuleCategory;
    fn eval(&self, change: &ChangeSet) -> Vec<Violation>;
}

/// Creation-only: nothing may be consumed.
pub struct NoPriorRecordRule;

impl Rule for NoPriorRecordRule {
    fn id(&self) -> &str {
        "no_prior_record"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structural
    }

    fn eval(&self, change: &ChangeSet) -> Vec<Violation> {
        if change.consumed.is_empty() {
            return vec![];
        }
        vec![Violation::PriorRecordConsumed {
            count: change.consumed.len(),
        }]
    }
}

pub struct SingleOutputRule;

impl Rule for SingleOutputRule {
    fn id(&self) -> &str {
        "single_output"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structural
    }

    fn eval(&self, change: &ChangeSet) -> Vec<Violation> {
        if change.produced.len() == 1 {
            return vec![];
        }
        vec![Violation::OutputCount {
            found: change.produced.len(),
        }]
    }
}

/// A party is the same as another when either its name or its owning key matches.
pub struct DistinctPartiesRule;

impl Rule for DistinctPartiesRule {
    fn id(&self) -> &str {
        "distinct_parties"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structural
    }

    fn eval(&self, change: &ChangeSet) -> Vec<Violation> {
        match change.candidate() {
            Some(r) if r.lender.name == r.borrower.name || r.lender.owning_key == r.borrower.owning_key => {
                vec![Violation::SameParty]
            }
            _ => vec![],
        }
    }
}

/// Signer set must be exactly the participants' owning keys.
pub struct SignersAreParticipantsRule;

impl Rule for SignersAreParticipantsRule {
    fn id(&self) -> &str {
        "signers_are_participants"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Structural
    }

    fn eval(&self, change: &ChangeSet) -> Vec<Violation> {
        let Some(record) = change.candidate() else {
            return vec![];
        };
        if let Some(missing) = record
            .participants()
            .into_iter()
            .find(|p| !change.signers.contains(&p.owning_key))
        {
            return vec![Violation::MissingSigner {
                party: missing.name.clone(),
            }];
        }
        if let Some(extra) = change.signers.iter().find(|k| !record.is_participant(k)) {
            return vec![Violation::UnexpectedSigner { key: extra.clone() }];
        }
        vec![]
    }
}

/// Text field must contain something other than whitespace.
pub struct NonBlankRule(pub Field);

impl Rule for NonBlankRule {
    fn id(&self) -> &str {
        "non_blank"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Field
    }

    fn eval(&self, change: &ChangeSet) -> Vec<Violation> {
        let Some(record) = change.candidate() else {
            return vec![];
        };
        match text_field(record, self.0) {
            Some(s) if s.trim().is_empty() => vec![Violation::Blank(self.0)],
            _ => vec![],
        }
    }
}

/// Numeric field must be strictly greater than zero. NaN is not positive.
pub struct PositiveRule(pub Field);

impl Rule for PositiveRule {
    fn id(&self) -> &str {
        "positive"
    }

    fn category(&self) -> RuleCategory {
        RuleCategory::Field
    }

    fn eval(&self, change: &ChangeSet) -> Vec<Violation> {
        let Some(record) = change.candidate() else {
            return vec![];
        };
        match numeric_field(record, self.0) {
            Some(v) if v.is_nan() || v <= 0.0 => vec![Violation::NotPositive(self.0)],
            _ => vec![],
        }
    }
}

fn text_field(record: &Record, field: Field) -> Option<&str> {
    let f = &record.fields;
    match field {
        Field::ChallengeName => Some(f.challenge_name.as_str()),
        Field::FirstName => Some(f.first_name.as_str()),
        Field::LastName => Some(f.last_name.as_str()),
        Field::Gender => Some(f.gender.as_str()),
        _ => None,
    }
}

fn numeric_field(record: &Record, field: Field) -> Option<f64> {
    let f = &record.fields;
    match field {
        Field::ChallengeYear => Some(f.challenge_year as f64),
        Field::PlaceCity => Some(f.place_city as f64),
        Field::PlaceGender => Some(f.place_gender as f64),
        Field::BibNumber => Some(f.bib_number as f64),
        Field::Time => Some(f.time),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::{Party, PartyKey, PartyName, RecordFields, RecordId};

    fn record() -> Record {
        Record::new(
            RecordFields {
                challenge_name: "Boston Marathon".into(),
                challenge_year: 2023,
                place_city: 5,
                place_gender: 2,
                bib_number: 1002,
                first_name: "Ana".into(),
                last_name: "Diaz".into(),
                time: 9350.5,
                gender: "F".into(),
            },
            Party::new(PartyName::new("O=A"), PartyKey("aa".into())),
            Party::new(PartyName::new("O=B"), PartyKey("bb".into())),
        )
    }

    #[test]
    fn test_no_prior_record_rule() {
        let mut change = ChangeSet::create(record());
        assert!(NoPriorRecordRule.eval(&change).is_empty());
        change.consumed.push(RecordId::new());
        assert_eq!(
            NoPriorRecordRule.eval(&change),
            vec![Violation::PriorRecordConsumed { count: 1 }]
        );
    }

    #[test]
    fn test_single_output_rule_counts() {
        let mut change = ChangeSet::create(record());
        change.produced.push(record());
        assert_eq!(SingleOutputRule.eval(&change), vec![Violation::OutputCount { found: 2 }]);
        change.produced.clear();
        assert_eq!(SingleOutputRule.eval(&change), vec![Violation::OutputCount { found: 0 }]);
    }

    #[test]
    fn test_distinct_parties_matches_on_key_or_name() {
        let mut r = record();
        r.borrower.owning_key = r.lender.owning_key.clone();
        assert_eq!(DistinctPartiesRule.eval(&ChangeSet::create(r)), vec![Violation::SameParty]);

        let mut r = record();
        r.borrower.name = r.lender.name.clone();
        assert_eq!(DistinctPartiesRule.eval(&ChangeSet::create(r)), vec![Violation::SameParty]);
    }

    #[test]
    fn test_signers_rule_missing_and_extra() {
        let mut change = ChangeSet::create(record());
        change.signers.remove(&PartyKey("bb".into()));
        assert_eq!(
            SignersAreParticipantsRule.eval(&change),
            vec![Violation::MissingSigner {
                party: PartyName::new("O=B")
            }]
        );

        let mut change = ChangeSet::create(record());
        change.signers.insert(PartyKey("cc".into()));
        assert_eq!(
            SignersAreParticipantsRule.eval(&change),
            vec![Violation::UnexpectedSigner {
                key: PartyKey("cc".into())
            }]
        );
    }

    #[test]
    fn test_non_blank_treats_whitespace_as_blank() {
        let mut r = record();
        r.fields.gender = "  ".into();
        let change = ChangeSet::create(r);
        assert_eq!(NonBlankRule(Field::Gender).eval(&change), vec![Violation::Blank(Field::Gender)]);
        assert!(NonBlankRule(Field::FirstName).eval(&change).is_empty());
    }

    #[test]
    fn test_positive_rejects_zero_negative_and_nan() {
        for t in [0.0, -1.5, f64::NAN] {
            let mut r = record();
            r.fields.time = t;
            assert_eq!(
                PositiveRule(Field::Time).eval(&ChangeSet::create(r)),
                vec![Violation::NotPositive(Field::Time)]
            );
        }
    }
}
