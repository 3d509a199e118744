use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_LEN: usize = 4;

/// Team abbreviation: 1-4 uppercase ASCII alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Abbreviation(String);

impl Abbreviation {
    /// Uppercases and validates `input`.
    pub fn new(input: &str) -> Result<Self, ValidationError> {
        let value = input.trim().to_ascii_uppercase();
        let valid = !value.is_empty()
            && value.len() <= MAX_LEN
            && value.chars().all(|ch| ch.is_ascii_alphanumeric());

        if !valid {
            return Err(ValidationError::InvalidAbbreviation {
                value: input.to_owned(),
            });
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Abbreviation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Abbreviation {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Abbreviation> for String {
    fn from(value: Abbreviation) -> Self {
        value.0
    }
}
