//! Provider adapters and the registry that dispatches to them.

mod balldontlie;
mod espn;
pub mod normalize;
mod oddsapi;
mod thesportsdb;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

pub use balldontlie::BallDontLieAdapter;
pub use espn::EspnAdapter;
pub use oddsapi::OddsApiAdapter;
pub use thesportsdb::TheSportsDbAdapter;

use crate::config::{ApexConfig, ProviderSettings};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{ProviderAdapter, SourceError};
use crate::{ApexError, ProviderId};

/// Sends `request` and decodes the JSON body, classifying failures the same
/// way for every provider.
pub(crate) async fn execute_json(
    http_client: &dyn HttpClient,
    provider: ProviderId,
    request: HttpRequest,
) -> Result<Value, SourceError> {
    let response = http_client.execute(request).await.map_err(|error| {
        if error.is_timeout() {
            SourceError::timeout(format!("{provider} request timed out: {}", error.message()))
        } else {
            SourceError::unavailable(format!("{provider} transport error: {}", error.message()))
        }
    })?;

    match response.status {
        429 => {
            return Err(SourceError::rate_limited(format!(
                "{provider} upstream returned status 429"
            )))
        }
        500..=599 => {
            return Err(SourceError::unavailable(format!(
                "{provider} upstream returned status {}",
                response.status
            )))
        }
        _ if !response.is_success() => {
            return Err(SourceError::upstream(format!(
                "{provider} upstream rejected request with status {}",
                response.status
            )))
        }
        _ => {}
    }

    serde_json::from_str(&response.body).map_err(|error| {
        SourceError::decode(format!("{provider} returned invalid JSON: {error}"))
    })
}

/// Record array at `pointer` inside a provider envelope. A missing or null
/// array means the provider had nothing to return.
pub(crate) fn records_at(
    body: &Value,
    pointer: &str,
    provider: ProviderId,
) -> Result<Vec<Value>, SourceError> {
    match body.pointer(pointer) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(records)) => Ok(records.clone()),
        Some(_) => Err(SourceError::decode(format!(
            "{provider} envelope field '{pointer}' is not an array"
        ))),
    }
}

fn timeout_ms(settings: &ProviderSettings) -> u64 {
    u64::try_from(settings.timeout.as_millis()).unwrap_or(u64::MAX)
}

/// Adapters keyed by provider.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id(), adapter))
            .collect();
        Self { adapters }
    }

    /// Builds one adapter per configured provider over a shared transport.
    pub fn from_config(config: &ApexConfig, http_client: Arc<dyn HttpClient>) -> Self {
        let adapters = config
            .providers
            .iter()
            .map(|settings| -> Arc<dyn ProviderAdapter> {
                let timeout_ms = timeout_ms(settings);
                let api_key = settings.api_key.clone().unwrap_or_default();
                match settings.id {
                    ProviderId::Espn => {
                        Arc::new(EspnAdapter::new(http_client.clone()).with_timeout_ms(timeout_ms))
                    }
                    ProviderId::BallDontLie => Arc::new(
                        BallDontLieAdapter::new(http_client.clone(), api_key)
                            .with_timeout_ms(timeout_ms),
                    ),
                    ProviderId::TheSportsDb => Arc::new(
                        TheSportsDbAdapter::new(http_client.clone(), api_key)
                            .with_timeout_ms(timeout_ms),
                    ),
                    ProviderId::OddsApi => Arc::new(
                        OddsApiAdapter::new(http_client.clone(), api_key)
                            .with_timeout_ms(timeout_ms),
                    ),
                }
            })
            .collect();
        Self::new(adapters)
    }

    /// Parses a provider tag.
    pub fn resolve(&self, tag: &str) -> Result<ProviderId, ApexError> {
        tag.parse::<ProviderId>()
            .map_err(|_| ApexError::UnknownProvider {
                provider: tag.trim().to_owned(),
            })
    }

    /// Registered adapter for `provider`.
    pub fn get(&self, provider: ProviderId) -> Result<Arc<dyn ProviderAdapter>, ApexError> {
        self.adapters
            .get(&provider)
            .cloned()
            .ok_or_else(|| ApexError::UnknownProvider {
                provider: provider.to_string(),
            })
    }

    pub fn contains(&self, provider: ProviderId) -> bool {
        self.adapters.contains_key(&provider)
    }

    /// Registered providers in stable order.
    pub fn providers(&self) -> Vec<ProviderId> {
        let mut providers: Vec<ProviderId> = self.adapters.keys().copied().collect();
        providers.sort();
        providers
    }
}
