use accord_core::{PartyName, RecordFields};
use serde::{Deserialize, Serialize};

/// Problems with caller-supplied input, found before any record is built.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InputValidationError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("time must be a finite number")]
    NonFiniteTime,
    #[error("party name missing or has wrong format: {0}")]
    MalformedPartyName(String),
    #[error("party not found")]
    PartyNotFound(PartyName),
}

/// Raw proposal as received by a front end; every value is optional until checked.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalInput {
    pub challenge_name: Option<String>,
    pub challenge_year: Option<i64>,
    pub place_city: Option<i64>,
    pub place_gender: Option<i64>,
    pub bib_number: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub time: Option<f64>,
    pub gender: Option<String>,
    pub party_name: Option<String>,
}

impl ProposalInput {
    pub fn from_fields(fields: RecordFields, party_name: impl Into<String>) -> Self {
        Self {
            challenge_name: Some(fields.challenge_name),
            challenge_year: Some(fields.challenge_year),
            place_city: Some(fields.place_city),
            place_gender: Some(fields.place_gender),
            bib_number: Some(fields.bib_number),
            first_name: Some(fields.first_name),
            last_name: Some(fields.last_name),
            time: Some(fields.time),
            gender: Some(fields.gender),
            party_name: Some(party_name.into()),
        }
    }

    /// Presence and format checks only. Value ranges belong to the record validator.
    pub fn into_parts(self) -> Result<(RecordFields, PartyName), InputValidationError> {
        let time = self.time.ok_or(InputValidationError::MissingField("time"))?;
        if !time.is_finite() {
            return Err(InputValidationError::NonFiniteTime);
        }
        let fields = RecordFields {
            challenge_name: self
                .challenge_name
                .ok_or(InputValidationError::MissingField("challengeName"))?,
            challenge_year: self
                .challenge_year
                .ok_or(InputValidationError::MissingField("challengeYear"))?,
            place_city: self.place_city.ok_or(InputValidationError::MissingField("placeCity"))?,
            place_gender: self
                .place_gender
                .ok_or(InputValidationError::MissingField("placeGender"))?,
            bib_number: self.bib_number.ok_or(InputValidationError::MissingField("bibNumber"))?,
            first_name: self.first_name.ok_or(InputValidationError::MissingField("firstName"))?,
            last_name: self.last_name.ok_or(InputValidationError::MissingField("lastName"))?,
            time,
            gender: self.gender.ok_or(InputValidationError::MissingField("gender"))?,
        };
        let party = parse_party_name(self.party_name.as_deref().unwrap_or(""))?;
        Ok((fields, party))
    }
}

/// A party name must carry an `O=` organisation attribute.
pub fn parse_party_name(raw: &str) -> Result<PartyName, InputValidationError> {
    let name = PartyName::new(raw.trim());
    match name.organisation() {
        Some(org) if !org.is_empty() => Ok(name),
        _ => Err(InputValidationError::MalformedPartyName(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> ProposalInput {
        ProposalInput::from_fields(
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
            "O=PartyB,L=New York,C=US",
        )
    }

    #[test]
    fn complete_input_splits_into_fields_and_party() {
        let (fields, party) = full().into_parts().unwrap();
        assert_eq!(fields.bib_number, 1002);
        assert_eq!(party.organisation(), Some("PartyB"));
    }

    #[test]
    fn out_of_range_values_pass_input_checks() {
        let mut input = full();
        input.challenge_year = Some(0);
        assert!(input.into_parts().is_ok());
    }

    #[test]
    fn missing_field_is_named() {
        let mut input = full();
        input.last_name = None;
        assert_eq!(input.into_parts(), Err(InputValidationError::MissingField("lastName")));
    }

    #[test]
    fn non_finite_time_rejected() {
        let mut input = full();
        input.time = Some(f64::INFINITY);
        assert_eq!(input.into_parts(), Err(InputValidationError::NonFiniteTime));
    }

    #[test]
    fn party_name_needs_organisation() {
        assert!(parse_party_name("O=PartyA,L=London,C=GB").is_ok());
        assert!(matches!(
            parse_party_name("L=London,C=GB"),
            Err(InputValidationError::MalformedPartyName(_))
        ));
        assert!(matches!(parse_party_name(""), Err(InputValidationError::MalformedPartyName(_))));
    }

    #[test]
    fn party_not_found_message() {
        let err = InputValidationError::PartyNotFound(PartyName::new("O=Nobody"));
        assert_eq!(err.to_string(), "party not found");
    }
}
