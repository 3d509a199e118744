use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in metadata, configuration and cache records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Espn,
    BallDontLie,
    TheSportsDb,
    OddsApi,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [Self::Espn, Self::BallDontLie, Self::TheSportsDb, Self::OddsApi];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Espn => "espn",
            Self::BallDontLie => "balldontlie",
            Self::TheSportsDb => "thesportsdb",
            Self::OddsApi => "oddsapi",
        }
    }

    /// Upper-case segment used in `APEX_<TAG>_*` environment variables.
    pub const fn env_tag(self) -> &'static str {
        match self {
            Self::Espn => "ESPN",
            Self::BallDontLie => "BALLDONTLIE",
            Self::TheSportsDb => "THESPORTSDB",
            Self::OddsApi => "ODDSAPI",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "espn" => Ok(Self::Espn),
            "balldontlie" => Ok(Self::BallDontLie),
            "thesportsdb" => Ok(Self::TheSportsDb),
            "oddsapi" => Ok(Self::OddsApi),
            other => Err(ValidationError::UnknownProvider {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_case_insensitively() {
        assert_eq!(" ESPN ".parse::<ProviderId>(), Ok(ProviderId::Espn));
        assert_eq!("OddsApi".parse::<ProviderId>(), Ok(ProviderId::OddsApi));
        assert!(matches!(
            "sportradar".parse::<ProviderId>(),
            Err(ValidationError::UnknownProvider { .. })
        ));
    }

    #[test]
    fn serialized_tag_matches_display() {
        for provider in ProviderId::ALL {
            let json = serde_json::to_string(&provider).expect("serializes");
            assert_eq!(json, format!("\"{provider}\""));
        }
    }
}
