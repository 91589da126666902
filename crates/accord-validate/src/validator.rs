use accord_core::{ChangeSet, PartyKey, Record};

use crate::rule::{
    DistinctPartiesRule, NoPriorRecordRule, NonBlankRule, PositiveRule, Rule, SignersAreParticipantsRule,
    SingleOutputRule,
};
use crate::types::{Field, RecordValidationError, RuleCategory, Violation};

/// Ordered rule set applied identically by both sides of an agreement.
///
/// Structural rules run first, in order, and the first failure is returned on
/// its own. Field rules then all run and every failure is returned together.
pub struct RecordValidator {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordValidator {
    pub fn new() -> Self {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(NoPriorRecordRule),
            Box::new(SingleOutputRule),
            Box::new(DistinctPartiesRule),
            Box::new(SignersAreParticipantsRule),
            Box::new(NonBlankRule(Field::ChallengeName)),
            Box::new(PositiveRule(Field::ChallengeYear)),
            Box::new(PositiveRule(Field::PlaceCity)),
            Box::new(PositiveRule(Field::PlaceGender)),
            Box::new(PositiveRule(Field::BibNumber)),
            Box::new(NonBlankRule(Field::FirstName)),
            Box::new(NonBlankRule(Field::LastName)),
            Box::new(PositiveRule(Field::Time)),
            Box::new(NonBlankRule(Field::Gender)),
        ];
        Self { rules }
    }

    pub fn validate(&self, change: &ChangeSet) -> Result<(), RecordValidationError> {
        let mut field_violations: Vec<Violation> = vec![];
        for rule in &self.rules {
            let found = rule.eval(change);
            if found.is_empty() {
                continue;
            }
            match rule.category() {
                RuleCategory::Structural => return Err(RecordValidationError::new(found)),
                RuleCategory::Field => field_violations.extend(found),
            }
        }
        if field_violations.is_empty() {
            Ok(())
        } else {
            Err(RecordValidationError::new(field_violations))
        }
    }
}

/// Validate a creation change set with the default rules.
pub fn validate(change: &ChangeSet) -> Result<(), RecordValidationError> {
    RecordValidator::new().validate(change)
}

/// Validate `record` as the single output of a creation signed by `signers`.
pub fn validate_candidate(
    record: &Record,
    signers: impl IntoIterator<Item = PartyKey>,
) -> Result<(), RecordValidationError> {
    let change = ChangeSet {
        consumed: vec![],
        produced: vec![record.clone()],
        signers: signers.into_iter().collect(),
    };
    validate(&change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::{Party, PartyName, RecordFields, RecordId};

    fn lender() -> Party {
        Party::new(PartyName::new("O=PartyA,L=London,C=GB"), PartyKey("aa".into()))
    }

    fn borrower() -> Party {
        Party::new(PartyName::new("O=PartyB,L=New York,C=US"), PartyKey("bb".into()))
    }

    fn fields() -> RecordFields {
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
        }
    }

    fn with(f: impl FnOnce(&mut RecordFields)) -> ChangeSet {
        let mut fields = fields();
        f(&mut fields);
        ChangeSet::create(Record::new(fields, lender(), borrower()))
    }

    #[test]
    fn valid_creation_passes() {
        assert_eq!(validate(&with(|_| {})), Ok(()));
    }

    #[test]
    fn zero_year_has_field_specific_reason() {
        let err = validate(&with(|f| f.challenge_year = 0)).unwrap_err();
        assert_eq!(err.to_string(), "challengeYear must be positive");
        assert_eq!(err.first().and_then(|v| v.field()), Some(Field::ChallengeYear));
    }

    #[test]
    fn every_numeric_field_is_checked() {
        let cases: Vec<(Field, Box<dyn Fn(&mut RecordFields)>)> = vec![
            (Field::ChallengeYear, Box::new(|f| f.challenge_year = -1)),
            (Field::PlaceCity, Box::new(|f| f.place_city = 0)),
            (Field::PlaceGender, Box::new(|f| f.place_gender = 0)),
            (Field::BibNumber, Box::new(|f| f.bib_number = -7)),
            (Field::Time, Box::new(|f| f.time = 0.0)),
        ];
        for (field, mutate) in cases {
            let err = validate(&with(|f| mutate(f))).unwrap_err();
            assert_eq!(err.violations(), &[Violation::NotPositive(field)]);
        }
    }

    #[test]
    fn all_field_violations_reported_in_order() {
        let err = validate(&with(|f| {
            f.gender = String::new();
            f.challenge_name = String::new();
            f.bib_number = 0;
        }))
        .unwrap_err();
        assert_eq!(
            err.violations(),
            &[
                Violation::Blank(Field::ChallengeName),
                Violation::NotPositive(Field::BibNumber),
                Violation::Blank(Field::Gender),
            ]
        );
        assert_eq!(
            err.to_string(),
            "challengeName must be non-empty; bibNumber must be positive; gender must be non-empty"
        );
        assert!(err.contains(&Violation::NotPositive(Field::BibNumber)));
        assert!(!err.contains(&Violation::Blank(Field::FirstName)));
    }

    #[test]
    fn same_party_rejected_regardless_of_fields() {
        let ok = ChangeSet::create(Record::new(fields(), lender(), lender()));
        let err = validate(&ok).unwrap_err();
        assert_eq!(err.to_string(), "lender and borrower must differ");

        let mut bad_fields = fields();
        bad_fields.first_name = String::new();
        let bad = ChangeSet::create(Record::new(bad_fields, lender(), lender()));
        assert_eq!(validate(&bad).unwrap_err().violations(), &[Violation::SameParty]);
    }

    #[test]
    fn structural_checks_short_circuit_in_order() {
        let mut change = with(|f| f.time = -1.0);
        change.consumed.push(RecordId::new());
        change.produced.push(change.produced[0].clone());
        let err = validate(&change).unwrap_err();
        assert_eq!(err.violations(), &[Violation::PriorRecordConsumed { count: 1 }]);

        change.consumed.clear();
        let err = validate(&change).unwrap_err();
        assert_eq!(err.violations(), &[Violation::OutputCount { found: 2 }]);
    }

    #[test]
    fn signer_set_must_match_exactly() {
        let record = Record::new(fields(), lender(), borrower());
        assert!(validate_candidate(&record, [PartyKey("aa".into()), PartyKey("bb".into())]).is_ok());

        let err = validate_candidate(&record, [PartyKey("aa".into())]).unwrap_err();
        assert_eq!(err.to_string(), "all participants must be signers");

        let err = validate_candidate(
            &record,
            [PartyKey("aa".into()), PartyKey("bb".into()), PartyKey("cc".into())],
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "signers must be exactly the participants");
    }
}
