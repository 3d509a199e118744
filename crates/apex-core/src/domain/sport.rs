use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Basketball,
    Football,
    Baseball,
    Hockey,
    Soccer,
}

impl Sport {
    pub const ALL: [Self; 5] = [
        Self::Basketball,
        Self::Football,
        Self::Baseball,
        Self::Hockey,
        Self::Soccer,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Basketball => "basketball",
            Self::Football => "football",
            Self::Baseball => "baseball",
            Self::Hockey => "hockey",
            Self::Soccer => "soccer",
        }
    }

    /// League reported when a provider does not name one.
    pub const fn default_league(self) -> &'static str {
        match self {
            Self::Basketball => "NBA",
            Self::Football => "NFL",
            Self::Baseball => "MLB",
            Self::Hockey => "NHL",
            Self::Soccer => "MLS",
        }
    }
}

impl Display for Sport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basketball" | "nba" => Ok(Self::Basketball),
            "football" | "nfl" => Ok(Self::Football),
            "baseball" | "mlb" => Ok(Self::Baseball),
            "hockey" | "nhl" => Ok(Self::Hockey),
            "soccer" | "mls" | "epl" => Ok(Self::Soccer),
            other => Err(ValidationError::UnknownSport {
                value: other.to_owned(),
            }),
        }
    }
}

/// Kind of canonical record a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Teams,
    Players,
    Games,
    Odds,
}

impl DataType {
    pub const ALL: [Self; 4] = [Self::Teams, Self::Players, Self::Games, Self::Odds];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Teams => "teams",
            Self::Players => "players",
            Self::Games => "games",
            Self::Odds => "odds",
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "teams" | "team" => Ok(Self::Teams),
            "players" | "player" => Ok(Self::Players),
            "games" | "game" | "schedule" => Ok(Self::Games),
            "odds" => Ok(Self::Odds),
            other => Err(ValidationError::UnknownDataType {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn league_aliases_map_to_sports() {
        assert_eq!("NBA".parse::<Sport>(), Ok(Sport::Basketball));
        assert_eq!("epl".parse::<Sport>(), Ok(Sport::Soccer));
        assert_eq!("Hockey".parse::<Sport>(), Ok(Sport::Hockey));
    }

    #[test]
    fn unknown_sport_is_a_validation_error() {
        let err = "curling".parse::<Sport>().expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::UnknownSport {
                value: String::from("curling")
            }
        );
    }

    #[test]
    fn data_type_accepts_singular_forms() {
        assert_eq!("game".parse::<DataType>(), Ok(DataType::Games));
        assert!("injuries".parse::<DataType>().is_err());
    }
}
