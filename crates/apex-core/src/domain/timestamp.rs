use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// RFC3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Strict parse: the input must carry a `Z` or `+00:00` offset.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| {
            ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            }
        })?;

        if parsed.offset() != UtcOffset::UTC {
            return Err(ValidationError::TimestampNotUtc {
                value: input.to_owned(),
            });
        }

        Ok(Self(parsed))
    }

    /// Converts any offset to UTC. Provider timestamps arrive in local offsets.
    pub fn from_offset_datetime(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }

    pub fn from_unix_ms(ms: i64) -> Option<Self> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
            .ok()
            .map(Self)
    }

    pub fn into_inner(self) -> OffsetDateTime {
        self.0
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("<unformattable>"))
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_rfc3339())
    }
}

impl<'de> Deserialize<'de> for UtcDateTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tipoff_in_utc_round_trips_through_json() {
        let tipoff: UtcDateTime = serde_json::from_str("\"2024-01-15T00:30:00Z\"").expect("utc tipoff");
        assert_eq!(tipoff.to_string(), "2024-01-15T00:30:00Z");
    }

    #[test]
    fn strict_parse_refuses_local_kickoff_times() {
        let err = UtcDateTime::parse("2024-01-14T19:30:00-05:00").expect_err("offset is not utc");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn local_kickoff_is_shifted_to_utc() {
        let local = OffsetDateTime::parse("2024-01-14T19:30:00-05:00", &Rfc3339).expect("parses");
        assert_eq!(
            UtcDateTime::from_offset_datetime(local).format_rfc3339(),
            "2024-01-15T00:30:00Z"
        );
    }

    #[test]
    fn cache_clock_millis_map_to_instants() {
        let value = UtcDateTime::from_unix_ms(1_705_276_800_000).expect("in range");
        assert_eq!(value.format_rfc3339(), "2024-01-15T00:00:00Z");
    }
}
