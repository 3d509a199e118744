use apex_core::{ApexError, ConfigError, ValidationError};
use serde_json::{json, Value};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Apex(#[from] ApexError),

    #[error(transparent)]
    Store(#[from] apex_store::StoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) => 2,
            Self::Apex(error) => match error {
                ApexError::Validation(_) | ApexError::Config(_) | ApexError::UnknownProvider { .. } => 2,
                ApexError::AllProvidersFailed { .. } | ApexError::RateLimitExceeded { .. } => 3,
                ApexError::Serialization(_) => 4,
                ApexError::Store(_) => 10,
            },
            Self::Serialization(_) => 4,
            Self::Store(_) | Self::Io(_) => 10,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Config(_) => "config",
            Self::Apex(error) => match error {
                ApexError::Validation(_) => "validation",
                ApexError::Config(_) | ApexError::UnknownProvider { .. } => "config",
                ApexError::AllProvidersFailed { .. } => "all_providers_failed",
                ApexError::RateLimitExceeded { .. } => "rate_limited",
                ApexError::Serialization(_) => "serialization",
                ApexError::Store(_) => "store",
            },
            Self::Store(_) => "store",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }

    /// Machine-readable error document printed on stdout.
    pub fn to_json(&self) -> Value {
        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Self::Apex(ApexError::AllProvidersFailed { cache_key, failures }) = self {
            error["cache_key"] = json!(cache_key);
            error["failures"] = json!(failures);
        }
        json!({ "error": error })
    }
}

#[cfg(test)]
mod tests {
    use apex_core::{FailureKind, ProviderFailure, ProviderId};

    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        let unknown_sport: CliError = ValidationError::UnknownSport {
            value: String::from("curling"),
        }
        .into();
        assert_eq!(unknown_sport.exit_code(), 2);

        let missing: CliError = ConfigError::NoProviders.into();
        assert_eq!(missing.exit_code(), 2);

        let exhausted: CliError = ApexError::AllProvidersFailed {
            cache_key: String::from("k"),
            failures: Vec::new(),
        }
        .into();
        assert_eq!(exhausted.exit_code(), 3);

        let io: CliError = std::io::Error::other("disk full").into();
        assert_eq!(io.exit_code(), 10);
    }

    #[test]
    fn aggregate_failure_document_lists_providers() {
        let error: CliError = ApexError::AllProvidersFailed {
            cache_key: String::from("apex:v1:odds:basketball:0011223344556677"),
            failures: vec![ProviderFailure::new(
                ProviderId::OddsApi,
                FailureKind::RateLimited,
                "minute budget exhausted",
            )],
        }
        .into();

        let document = error.to_json();
        assert_eq!(document["error"]["code"], "all_providers_failed");
        assert_eq!(document["error"]["failures"][0]["provider"], "oddsapi");
        assert_eq!(document["error"]["failures"][0]["kind"], "rate_limited");
    }
}
