//! Cache-first read path with provider fallback.
//!
//! Each request moves through the same states, strictly in order:
//!
//! ```text
//! CacheCheck ──fresh──▶ done
//!     │ miss/stale/force_refresh
//!     ▼
//! ProviderAttempt ──ok──▶ write-through ──▶ done
//!     │ denied/failed
//!     ▼
//! NextProvider ... (priority order)
//!     │ exhausted
//!     ▼
//! StaleFallback ──cached──▶ done (stale=true)
//!     │ nothing cached
//!     ▼
//! Failure (AllProvidersFailed)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::adapters::ProviderRegistry;
use crate::cache::{CacheLookup, CacheStore};
use crate::config::{ApexConfig, CacheTtls};
use crate::envelope::{ApexResponse, ProviderAttempt, ResponseMeta};
use crate::error::{FailureKind, ProviderFailure};
use crate::provider::NormalizedBatch;
use crate::rate_limiter::{RateLimiter, Reservation};
use crate::status_ledger::GameStatusLedger;
use crate::{ApexError, CanonicalPayload, DataRequest, ProviderId};

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(5);

/// Sequences cache and provider calls for one logical request.
///
/// Holds no request state of its own; every collaborator is shared.
#[derive(Clone)]
pub struct FallbackOrchestrator {
    limiter: Arc<RateLimiter>,
    cache: Arc<CacheStore>,
    registry: Arc<ProviderRegistry>,
    ledger: Arc<GameStatusLedger>,
    priority: Vec<ProviderId>,
    timeouts: HashMap<ProviderId, Duration>,
    ttls: CacheTtls,
}

/// Accumulates metadata while a request is evaluated.
struct Trace {
    started: Instant,
    meta: ResponseMeta,
    failures: Vec<ProviderFailure>,
}

impl Trace {
    fn new(cache_key: &str) -> Self {
        Self {
            started: Instant::now(),
            meta: ResponseMeta::new(Uuid::new_v4().to_string(), cache_key),
            failures: Vec::new(),
        }
    }

    fn fail(&mut self, provider: ProviderId, kind: FailureKind, message: String, attempt_started: Instant) {
        tracing::warn!(
            request_id = %self.meta.request_id,
            provider = %provider,
            failure = kind.as_str(),
            error = %message,
            "provider attempt failed"
        );
        self.meta.attempts.push(ProviderAttempt::failed(
            provider,
            kind,
            message.clone(),
            elapsed_ms(attempt_started),
        ));
        self.failures.push(ProviderFailure::new(provider, kind, message));
    }

    fn finish(mut self, source: String, stale: bool, data: CanonicalPayload) -> ApexResponse {
        self.meta.source = source;
        self.meta.stale = stale;
        self.meta.response_time_ms = elapsed_ms(self.started);
        ApexResponse {
            meta: self.meta,
            data,
        }
    }
}

impl FallbackOrchestrator {
    pub fn new(
        limiter: Arc<RateLimiter>,
        cache: Arc<CacheStore>,
        registry: Arc<ProviderRegistry>,
        ledger: Arc<GameStatusLedger>,
        priority: Vec<ProviderId>,
        ttls: CacheTtls,
    ) -> Self {
        Self {
            limiter,
            cache,
            registry,
            ledger,
            priority,
            timeouts: HashMap::new(),
            ttls,
        }
    }

    /// Priority, TTLs and per-provider timeouts taken from `config`.
    pub fn from_config(
        config: &ApexConfig,
        limiter: Arc<RateLimiter>,
        cache: Arc<CacheStore>,
        registry: Arc<ProviderRegistry>,
        ledger: Arc<GameStatusLedger>,
    ) -> Self {
        let mut orchestrator = Self::new(
            limiter,
            cache,
            registry,
            ledger,
            config.priority(),
            config.cache.ttls,
        );
        for provider in &config.providers {
            orchestrator = orchestrator.with_timeout(provider.id, provider.timeout);
        }
        orchestrator
    }

    pub fn with_timeout(mut self, provider: ProviderId, timeout: Duration) -> Self {
        self.timeouts.insert(provider, timeout);
        self
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn priority(&self) -> &[ProviderId] {
        &self.priority
    }

    /// Providers that will be tried for `request`, in priority order.
    ///
    /// A provider in the priority list without a registered adapter is a
    /// configuration fault and fails the request.
    pub fn candidates(&self, request: &DataRequest) -> Result<Vec<ProviderId>, ApexError> {
        let mut candidates = Vec::with_capacity(self.priority.len());
        for provider in &self.priority {
            let adapter = self.registry.get(*provider)?;
            if adapter.supports(request.sport, request.data_type) {
                candidates.push(*provider);
            }
        }
        Ok(candidates)
    }

    /// Serves `request` from cache or providers, falling back to stale data.
    pub async fn execute(&self, request: &DataRequest) -> Result<ApexResponse, ApexError> {
        let cache_key = request.cache_key();
        let mut trace = Trace::new(&cache_key);
        let candidates = self.candidates(request)?;

        if request.force_refresh {
            tracing::debug!(cache_key = %cache_key, "force refresh requested; skipping cache");
        } else if let CacheLookup::Fresh(value) = self.cache.lookup(&cache_key).await {
            if let Some(payload) = decode_cached(&cache_key, &value) {
                return Ok(trace.finish(String::from(crate::envelope::CACHE_SOURCE), false, payload));
            }
        }

        for provider in candidates {
            if let Some(batch) = self.attempt(provider, request, &mut trace).await? {
                return self.accept(provider, request, &cache_key, batch, trace).await;
            }
        }

        self.fall_back(&cache_key, trace).await
    }

    /// One provider call. `Ok(None)` means the provider failed and the next
    /// one should be tried.
    async fn attempt(
        &self,
        provider: ProviderId,
        request: &DataRequest,
        trace: &mut Trace,
    ) -> Result<Option<NormalizedBatch>, ApexError> {
        let attempt_started = Instant::now();
        let adapter = self.registry.get(provider)?;

        if let Reservation::Denied {
            window,
            retry_after,
        } = self.limiter.reserve(provider)?
        {
            trace.fail(
                provider,
                FailureKind::RateLimited,
                format!(
                    "{} budget exhausted; retry after {}ms",
                    window.as_str(),
                    retry_after.as_millis()
                ),
                attempt_started,
            );
            return Ok(None);
        }

        let timeout = self
            .timeouts
            .get(&provider)
            .copied()
            .unwrap_or(DEFAULT_PROVIDER_TIMEOUT);
        let raw_records = match tokio::time::timeout(timeout, adapter.fetch(request)).await {
            Ok(Ok(records)) => records,
            Ok(Err(error)) => {
                trace.fail(
                    provider,
                    error.failure_kind(),
                    error.message().to_owned(),
                    attempt_started,
                );
                return Ok(None);
            }
            Err(_) => {
                trace.fail(
                    provider,
                    FailureKind::Timeout,
                    format!("no answer within {}ms", timeout.as_millis()),
                    attempt_started,
                );
                return Ok(None);
            }
        };

        let batch = adapter.normalize(request.data_type, &raw_records, request.sport);
        if batch.all_rejected() {
            let reason = batch
                .rejected
                .first()
                .map(ToString::to_string)
                .unwrap_or_default();
            trace.fail(
                provider,
                FailureKind::Normalization,
                format!("all {} record(s) rejected; first: {reason}", batch.received),
                attempt_started,
            );
            return Ok(None);
        }

        for rejected in &batch.rejected {
            tracing::warn!(
                request_id = %trace.meta.request_id,
                provider = %provider,
                field = %rejected.field,
                reason = %rejected.reason,
                "record excluded by normalization"
            );
            trace.meta.warnings.push(rejected.to_string());
        }
        trace.meta.skipped_records += batch.rejected.len();
        trace
            .meta
            .attempts
            .push(ProviderAttempt::succeeded(provider, elapsed_ms(attempt_started)));

        Ok(Some(batch))
    }

    async fn accept(
        &self,
        provider: ProviderId,
        request: &DataRequest,
        cache_key: &str,
        batch: NormalizedBatch,
        mut trace: Trace,
    ) -> Result<ApexResponse, ApexError> {
        let mut payload = batch.payload;
        if let CanonicalPayload::Games(games) = &mut payload {
            trace.meta.anomalies = self.ledger.reconcile(games);
            for anomaly in &trace.meta.anomalies {
                trace.meta.warnings.push(format!(
                    "game {} reported {} after {}; keeping {}",
                    anomaly.game_id, anomaly.reported, anomaly.previous, anomaly.previous
                ));
            }
        }

        let value = serde_json::to_string(&payload)?;
        let ttl = self.ttls.for_data_type(request.data_type);
        if let Err(error) = self.cache.set(cache_key, value, ttl).await {
            tracing::warn!(cache_key, error = %error, "durable cache write failed");
            trace
                .meta
                .warnings
                .push(format!("durable cache write failed: {error}"));
        }

        if !trace.failures.is_empty() {
            trace.meta.warnings.push(format!(
                "fallback succeeded with '{provider}' after {} failed attempt(s)",
                trace.failures.len()
            ));
        }

        tracing::info!(
            request_id = %trace.meta.request_id,
            provider = %provider,
            cache_key,
            records = payload.len(),
            skipped = trace.meta.skipped_records,
            "provider answered"
        );
        Ok(trace.finish(provider.to_string(), false, payload))
    }

    async fn fall_back(&self, cache_key: &str, mut trace: Trace) -> Result<ApexResponse, ApexError> {
        let cached = match self.cache.lookup(cache_key).await {
            CacheLookup::Stale {
                value,
                age_past_ttl,
            } => Some((value, age_past_ttl)),
            CacheLookup::Fresh(value) => Some((value, Duration::ZERO)),
            CacheLookup::Miss => None,
        };

        if let Some((value, age_past_ttl)) = cached {
            if let Some(payload) = decode_cached(cache_key, &value) {
                tracing::warn!(
                    request_id = %trace.meta.request_id,
                    cache_key,
                    age_past_ttl_ms = u64::try_from(age_past_ttl.as_millis()).unwrap_or(u64::MAX),
                    "all providers failed; serving stale cache entry"
                );
                trace.meta.warnings.push(format!(
                    "all providers failed; serving cached data {}s past its TTL",
                    age_past_ttl.as_secs()
                ));
                return Ok(trace.finish(String::from(crate::envelope::CACHE_SOURCE), true, payload));
            }
        }

        let error = ApexError::AllProvidersFailed {
            cache_key: cache_key.to_owned(),
            failures: trace.failures,
        };
        tracing::error!(request_id = %trace.meta.request_id, error = %error, "request failed");
        Err(error)
    }
}

fn decode_cached(cache_key: &str, value: &str) -> Option<CanonicalPayload> {
    match serde_json::from_str(value) {
        Ok(payload) => Some(payload),
        Err(error) => {
            tracing::warn!(cache_key, error = %error, "cached payload is unreadable; ignoring");
            None
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
