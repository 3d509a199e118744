mod cache;
mod fetch;
mod sources;

use std::sync::Arc;

use apex_core::{
    ApexConfig, CacheStore, Clock, DataRequest, DuckDbStore, DurableStore, FallbackOrchestrator,
    GameStatusLedger, HttpClient, ProviderRegistry, RateLimiter, ReqwestHttpClient, SystemClock,
    ValidationError, DEFAULT_LEDGER_RETENTION,
};
use serde_json::Value;

use crate::cli::{CacheCommand, Cli, Command, RequestArgs};
use crate::error::CliError;
use crate::mock;

/// Everything a command needs, wired once per invocation.
pub struct Context {
    pub config: ApexConfig,
    pub orchestrator: FallbackOrchestrator,
}

impl Context {
    pub fn build(use_mock: bool) -> Result<Self, CliError> {
        let config = if use_mock {
            mock::config()?
        } else {
            ApexConfig::from_env()?
        };

        let http_client: Arc<dyn HttpClient> = if use_mock {
            Arc::new(mock::http_client())
        } else {
            Arc::new(ReqwestHttpClient::new())
        };
        let durable = if use_mock {
            None
        } else {
            open_durable(&config)
        };

        Ok(Self::from_parts(config, http_client, durable))
    }

    pub fn from_parts(
        config: ApexConfig,
        http_client: Arc<dyn HttpClient>,
        durable: Option<Arc<dyn DurableStore>>,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let orchestrator = FallbackOrchestrator::from_config(
            &config,
            Arc::new(RateLimiter::from_config(&config, clock.clone())),
            Arc::new(CacheStore::new(durable, clock.clone(), config.cache.stale_retention)),
            Arc::new(ProviderRegistry::from_config(&config, http_client)),
            Arc::new(GameStatusLedger::with_clock(clock, DEFAULT_LEDGER_RETENTION)),
        );
        Self {
            config,
            orchestrator,
        }
    }
}

/// Opens the shared DuckDB tier. A store that cannot be opened degrades the
/// cache to process memory rather than failing the command.
fn open_durable(config: &ApexConfig) -> Option<Arc<dyn DurableStore>> {
    let path = config.cache_path();
    match DuckDbStore::open(&path) {
        Ok(store) => {
            let store: Arc<dyn DurableStore> = Arc::new(store);
            Some(store)
        }
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "durable cache unavailable; using in-memory cache only"
            );
            None
        }
    }
}

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    // Key derivation is pure and must work without any configuration.
    if let Command::Cache(args) = &cli.command {
        if let CacheCommand::Key(request) = &args.command {
            return cache::key(request);
        }
    }

    let context = Context::build(cli.mock)?;
    match &cli.command {
        Command::Fetch(args) => fetch::run(args, &context).await,
        Command::Cache(args) => cache::run(&args.command, &context).await,
        Command::Sources => sources::run(&context),
    }
}

pub fn parse_request(args: &RequestArgs) -> Result<DataRequest, ValidationError> {
    args.filters
        .iter()
        .try_fold(DataRequest::parse(&args.data_type, &args.sport)?, |request, pair| {
            request.with_filter_pair(pair)
        })
}
