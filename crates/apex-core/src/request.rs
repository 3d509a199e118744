use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache_key::cache_key;
use crate::{DataType, Sport, ValidationError};

/// One logical read: data type, sport and filter parameters.
///
/// Filters understood by adapters: `team` (provider team id), `date`
/// (`YYYY-MM-DD`), `season`, `search`. Unknown filters are carried into the
/// cache key but otherwise ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequest {
    pub data_type: DataType,
    pub sport: Sport,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub force_refresh: bool,
}

impl DataRequest {
    pub fn new(data_type: DataType, sport: Sport) -> Self {
        Self {
            data_type,
            sport,
            filters: BTreeMap::new(),
            force_refresh: false,
        }
    }

    /// Parses user-facing strings such as `("games", "nba")`.
    pub fn parse(data_type: &str, sport: &str) -> Result<Self, ValidationError> {
        Ok(Self::new(data_type.parse()?, sport.parse()?))
    }

    pub fn with_filter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.filters
            .insert(key.trim().to_ascii_lowercase(), value.into().trim().to_owned());
        self
    }

    /// Adds a filter written as `key=value`.
    pub fn with_filter_pair(self, pair: &str) -> Result<Self, ValidationError> {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(ValidationError::InvalidFilter {
                value: pair.to_owned(),
            });
        };
        if key.trim().is_empty() {
            return Err(ValidationError::InvalidFilter {
                value: pair.to_owned(),
            });
        }
        Ok(self.with_filter(key, value))
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn filter(&self, key: &str) -> Option<&str> {
        self.filters
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn cache_key(&self) -> String {
        cache_key(self.data_type, self.sport, &self.filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filter_pairs() {
        let request = DataRequest::parse("games", "nba")
            .expect("valid request")
            .with_filter_pair("Date=2024-01-15")
            .expect("valid filter");

        assert_eq!(request.sport, Sport::Basketball);
        assert_eq!(request.filter("date"), Some("2024-01-15"));
        assert!(matches!(
            request.clone().with_filter_pair("nonsense"),
            Err(ValidationError::InvalidFilter { .. })
        ));
    }

    #[test]
    fn force_refresh_does_not_change_the_cache_key() {
        let request = DataRequest::new(DataType::Teams, Sport::Hockey);
        let refreshed = request.clone().with_force_refresh(true);
        assert_eq!(request.cache_key(), refreshed.cache_key());
    }
}
