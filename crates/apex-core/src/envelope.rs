use serde::{Deserialize, Serialize};

use crate::error::FailureKind;
use crate::status_ledger::StatusAnomaly;
use crate::{CanonicalPayload, ProviderId, UtcDateTime};

/// `source` value for answers served from the cache.
pub const CACHE_SOURCE: &str = "cache";

/// Canonical payload plus the metadata describing how it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApexResponse {
    pub meta: ResponseMeta,
    pub data: CanonicalPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub generated_at: UtcDateTime,
    /// Provider tag, or `cache`.
    pub source: String,
    pub stale: bool,
    pub response_time_ms: u64,
    pub cache_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attempts: Vec<ProviderAttempt>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub anomalies: Vec<StatusAnomaly>,
    #[serde(default)]
    pub skipped_records: usize,
}

impl ResponseMeta {
    pub fn new(request_id: impl Into<String>, cache_key: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            generated_at: UtcDateTime::now(),
            source: String::from(CACHE_SOURCE),
            stale: false,
            response_time_ms: 0,
            cache_key: cache_key.into(),
            attempts: Vec::new(),
            warnings: Vec::new(),
            anomalies: Vec::new(),
            skipped_records: 0,
        }
    }

    pub fn is_from_cache(&self) -> bool {
        self.source == CACHE_SOURCE
    }
}

/// One provider call made (or refused) while serving a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider: ProviderId,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

impl ProviderAttempt {
    pub fn succeeded(provider: ProviderId, latency_ms: u64) -> Self {
        Self {
            provider,
            succeeded: true,
            failure: None,
            message: None,
            latency_ms,
        }
    }

    pub fn failed(
        provider: ProviderId,
        failure: FailureKind,
        message: impl Into<String>,
        latency_ms: u64,
    ) -> Self {
        Self {
            provider,
            succeeded: false,
            failure: Some(failure),
            message: Some(message.into()),
            latency_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataType;

    #[test]
    fn empty_collections_are_omitted_from_json() {
        let response = ApexResponse {
            meta: ResponseMeta::new("req-1", "apex:v1:teams:basketball:0011223344556677"),
            data: CanonicalPayload::empty(DataType::Teams),
        };

        let json = serde_json::to_value(&response).expect("serializes");
        assert_eq!(json["meta"]["source"], "cache");
        assert!(json["meta"].get("attempts").is_none());
        assert_eq!(json["data"]["type"], "teams");
    }
}
