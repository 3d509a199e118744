//! # Apex Core
//!
//! Provider orchestration for sports data: rate limiting, two-tier caching,
//! schema normalization and fallback across upstream providers.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (ESPN, balldontlie, TheSportsDB, The Odds API) and registry |
//! | [`cache`] | Two-tier cache with stale reads |
//! | [`cache_key`] | Deterministic request-shape keys |
//! | [`clock`] | Injectable time source |
//! | [`config`] | Environment configuration |
//! | [`domain`] | Canonical teams, players, games and odds |
//! | [`envelope`] | Response metadata |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP transport abstraction |
//! | [`orchestrator`] | Cache-first read path with provider fallback |
//! | [`provider`] | Provider adapter contract |
//! | [`rate_limiter`] | Per-provider minute/day/burst budgets |
//! | [`status_ledger`] | Game status regression detection |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  apex CLI       │
//! └────────┬────────┘
//!          │ DataRequest
//!          ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │ FallbackOrchestrator │────▶│ CacheStore       │──▶ DurableStore (DuckDB)
//! └────────┬─────────────┘     └──────────────────┘
//!          │
//!          ├──────────────▶ RateLimiter
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ ProviderAdapter │────▶│ HttpClient       │
//! └────────┬────────┘     └──────────────────┘
//!          ▼
//! ┌─────────────────┐
//! │ CanonicalPayload│
//! └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use apex_core::*;
//!
//! let config = ApexConfig::from_env()?;
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
//! let orchestrator = FallbackOrchestrator::from_config(
//!     &config,
//!     Arc::new(RateLimiter::from_config(&config, clock.clone())),
//!     Arc::new(CacheStore::in_memory(clock, config.cache.stale_retention)),
//!     Arc::new(ProviderRegistry::from_config(&config, http)),
//!     Arc::new(GameStatusLedger::new()),
//! );
//! let response = orchestrator.execute(&DataRequest::parse("teams", "nba")?).await?;
//! ```

pub mod adapters;
pub mod cache;
pub mod cache_key;
pub mod clock;
pub mod config;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod orchestrator;
pub mod provider;
pub mod rate_limiter;
pub mod request;
pub mod retry;
pub mod source;
pub mod status_ledger;

pub use adapters::{
    BallDontLieAdapter, EspnAdapter, OddsApiAdapter, ProviderRegistry, TheSportsDbAdapter,
};

pub use cache::{CacheLookup, CacheStats, CacheStore};

pub use cache_key::{cache_key, CACHE_KEY_PREFIX};

pub use clock::{Clock, ManualClock, SystemClock};

pub use config::{ApexConfig, CacheSettings, CacheTtls, ProviderSettings};

pub use domain::{
    Abbreviation, CanonicalGame, CanonicalOdds, CanonicalPayload, CanonicalPlayer, CanonicalTeam,
    DataType, GameSide, GameStatus, GameType, PhysicalAttributes, Sport, TeamRecord, TeamRef,
    UtcDateTime,
};

pub use envelope::{ApexResponse, ProviderAttempt, ResponseMeta, CACHE_SOURCE};

pub use error::{
    ApexError, ConfigError, FailureKind, NormalizationError, ProviderFailure, ValidationError,
};

pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient,
    StaticHttpClient,
};

pub use orchestrator::FallbackOrchestrator;

pub use provider::{FetchFuture, NormalizedBatch, ProviderAdapter, SourceError, SourceErrorKind};

pub use rate_limiter::{
    BudgetSnapshot, BurstMode, ProviderLimits, RateLimiter, RateLimiterSettings, RateWindow,
    Reservation,
};

pub use request::DataRequest;

pub use retry::Backoff;

pub use source::ProviderId;

pub use status_ledger::{GameStatusLedger, StatusAnomaly, DEFAULT_LEDGER_RETENTION};

pub use apex_store::{DurableStore, DuckDbStore, MemoryStore, StoreError};
