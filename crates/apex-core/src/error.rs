use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ProviderId;

/// Malformed request input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown sport '{value}', expected one of basketball, football, baseball, hockey, soccer")]
    UnknownSport { value: String },
    #[error("unknown data type '{value}', expected one of teams, players, games, odds")]
    UnknownDataType { value: String },
    #[error("unknown provider '{value}', expected one of espn, balldontlie, thesportsdb, oddsapi")]
    UnknownProvider { value: String },

    #[error("abbreviation must be 1-4 ASCII alphanumeric characters: '{value}'")]
    InvalidAbbreviation { value: String },

    #[error("filter must be written as key=value: '{value}'")]
    InvalidFilter { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
}

/// Startup configuration errors. Always fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {name}")]
    Missing { name: String },
    #[error("setting {name}='{value}' is not a valid {expected}")]
    Invalid {
        name: String,
        value: String,
        expected: &'static str,
    },
    #[error("setting {name} must be greater than zero")]
    Zero { name: String },
    #[error("APEX_PROVIDERS must name at least one provider")]
    NoProviders,
    #[error("provider '{provider}' is listed more than once in APEX_PROVIDERS")]
    DuplicateProvider { provider: String },
    #[error(transparent)]
    UnknownProvider(#[from] ValidationError),
}

/// A provider-native record that could not be mapped to the canonical schema.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{provider} record rejected at field '{field}': {reason}")]
pub struct NormalizationError {
    pub provider: ProviderId,
    pub field: String,
    pub reason: String,
}

impl NormalizationError {
    pub fn new(provider: ProviderId, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            provider,
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(provider: ProviderId, field: impl Into<String>) -> Self {
        Self::new(provider, field, "required field is missing")
    }
}

/// Why a single provider could not answer a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    RateLimited,
    Timeout,
    Unavailable,
    Upstream,
    Normalization,
    Unsupported,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::Upstream => "upstream",
            Self::Normalization => "normalization",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(provider: ProviderId, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }
}

/// Top-level error type for orchestration operations.
#[derive(Debug, Error)]
pub enum ApexError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("provider '{provider}' is not configured")]
    UnknownProvider { provider: String },

    #[error("rate limit for '{provider}' still exceeded after {attempts} attempt(s); retry after {retry_after_ms}ms")]
    RateLimitExceeded {
        provider: ProviderId,
        attempts: u32,
        retry_after_ms: u64,
    },

    #[error("{}", describe_failures(.cache_key, .failures))]
    AllProvidersFailed {
        cache_key: String,
        failures: Vec<ProviderFailure>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache store error: {0}")]
    Store(#[from] apex_store::StoreError),
}

fn describe_failures(cache_key: &str, failures: &[ProviderFailure]) -> String {
    if failures.is_empty() {
        return format!("no configured provider supports request {cache_key}");
    }

    let mut message = format!("all providers failed for {cache_key}:");
    for failure in failures {
        let _ = write!(
            message,
            " [{}: {} - {}]",
            failure.provider,
            failure.kind.as_str(),
            failure.message
        );
    }
    message
}
