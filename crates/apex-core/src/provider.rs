//! Provider adapter contract.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`id`](ProviderAdapter::id) | Provider identifier |
//! | [`supports`](ProviderAdapter::supports) | Sport/data-type support matrix |
//! | [`fetch`](ProviderAdapter::fetch) | Authenticated HTTP call returning raw records |
//! | `normalize_*` | Pure mapping of one raw record into the canonical schema |
//! | [`normalize`](ProviderAdapter::normalize) | Batch mapping that excludes bad records |

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::error::FailureKind;
use crate::{
    CanonicalGame, CanonicalOdds, CanonicalPayload, CanonicalPlayer, CanonicalTeam, DataRequest,
    DataType, NormalizationError, ProviderId, Sport,
};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    Timeout,
    Upstream,
    Decode,
    Unsupported,
    InvalidRequest,
}

/// Structured source error used by orchestrator fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
}

impl SourceError {
    fn new(kind: SourceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Unavailable, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::RateLimited, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Timeout, message)
    }

    /// Non-2xx answer other than 429 or 5xx.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Upstream, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::Decode, message)
    }

    pub fn unsupported(provider: ProviderId, sport: Sport, data_type: DataType) -> Self {
        Self::new(
            SourceErrorKind::Unsupported,
            format!("{provider} does not serve {data_type} for {sport}"),
        )
    }

    /// The request lacks something this provider needs, such as a filter.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(SourceErrorKind::InvalidRequest, message)
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::Timeout => "source.timeout",
            SourceErrorKind::Upstream => "source.upstream",
            SourceErrorKind::Decode => "source.decode",
            SourceErrorKind::Unsupported => "source.unsupported",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
        }
    }

    pub const fn failure_kind(&self) -> FailureKind {
        match self.kind {
            SourceErrorKind::Unavailable => FailureKind::Unavailable,
            SourceErrorKind::RateLimited => FailureKind::RateLimited,
            SourceErrorKind::Timeout => FailureKind::Timeout,
            SourceErrorKind::Upstream | SourceErrorKind::Decode => FailureKind::Upstream,
            SourceErrorKind::Unsupported | SourceErrorKind::InvalidRequest => {
                FailureKind::Unsupported
            }
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<Value>, SourceError>> + Send + 'a>>;

/// Outcome of normalizing one fetched batch.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub payload: CanonicalPayload,
    pub rejected: Vec<NormalizationError>,
    pub received: usize,
}

impl NormalizedBatch {
    /// True when records arrived but none survived normalization.
    pub fn all_rejected(&self) -> bool {
        self.received > 0 && self.payload.is_empty()
    }
}

/// Contract implemented once per upstream provider.
///
/// Implementations must be `Send + Sync`; the registry shares them across
/// concurrent requests.
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    fn supports(&self, sport: Sport, data_type: DataType) -> bool;

    /// Calls the provider and returns the raw record array from its envelope.
    fn fetch<'a>(&'a self, request: &'a DataRequest) -> FetchFuture<'a>;

    fn normalize_team(&self, raw: &Value, sport: Sport) -> Result<CanonicalTeam, NormalizationError>;

    fn normalize_player(
        &self,
        raw: &Value,
        sport: Sport,
    ) -> Result<CanonicalPlayer, NormalizationError>;

    fn normalize_game(&self, raw: &Value, sport: Sport) -> Result<CanonicalGame, NormalizationError>;

    fn normalize_odds(&self, raw: &Value, sport: Sport) -> Result<CanonicalOdds, NormalizationError> {
        let _ = (raw, sport);
        Err(NormalizationError::new(
            self.id(),
            "odds",
            "provider does not publish odds",
        ))
    }

    /// Normalizes record by record. Failures are collected, never fatal.
    fn normalize(&self, data_type: DataType, raw_records: &[Value], sport: Sport) -> NormalizedBatch {
        let mut rejected = Vec::new();
        let payload = match data_type {
            DataType::Teams => CanonicalPayload::Teams(collect(raw_records, &mut rejected, |raw| {
                self.normalize_team(raw, sport)
            })),
            DataType::Players => {
                CanonicalPayload::Players(collect(raw_records, &mut rejected, |raw| {
                    self.normalize_player(raw, sport)
                }))
            }
            DataType::Games => CanonicalPayload::Games(collect(raw_records, &mut rejected, |raw| {
                self.normalize_game(raw, sport)
            })),
            DataType::Odds => CanonicalPayload::Odds(collect(raw_records, &mut rejected, |raw| {
                self.normalize_odds(raw, sport)
            })),
        };

        NormalizedBatch {
            payload,
            rejected,
            received: raw_records.len(),
        }
    }
}

fn collect<T, F>(raw_records: &[Value], rejected: &mut Vec<NormalizationError>, normalize: F) -> Vec<T>
where
    F: Fn(&Value) -> Result<T, NormalizationError>,
{
    let mut records = Vec::with_capacity(raw_records.len());
    for raw in raw_records {
        match normalize(raw) {
            Ok(record) => records.push(record),
            Err(error) => rejected.push(error),
        }
    }
    records
}
