//! Environment-driven configuration.
//!
//! # Environment Variables
//!
//! | Variable | Required | Meaning |
//! |----------|----------|---------|
//! | `APEX_PROVIDERS` | yes | Comma-separated provider tags in priority order |
//! | `APEX_<TAG>_RATE_PER_MINUTE` | yes | Minute ceiling |
//! | `APEX_<TAG>_RATE_PER_DAY` | yes | Day ceiling |
//! | `APEX_<TAG>_BURST` | yes | Burst ceiling |
//! | `APEX_<TAG>_TIMEOUT_MS` | no (5000) | Per-call timeout |
//! | `APEX_<TAG>_API_KEY` | balldontlie, oddsapi | Credential |
//! | `APEX_CACHE_TTL_{TEAMS,PLAYERS,GAMES,ODDS}_SECS` | yes | Per-data-type TTL |
//! | `APEX_CACHE_STALE_RETENTION_SECS` | no (7 days) | Physical retention past TTL |
//! | `APEX_BURST_WINDOW_MS` | no (1000) | Burst window |
//! | `APEX_BURST_MODE` | no (`fixed_window`) | `fixed_window` or `token_bucket` |
//! | `APEX_MAX_RETRY_AFTER_MS` | no (5000) | Retry-after cap |
//! | `APEX_HOME` | no (`$HOME/.apex`) | Data directory |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::rate_limiter::{BurstMode, ProviderLimits, RateLimiterSettings};
use crate::{ConfigError, DataType, ProviderId};

const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_STALE_RETENTION_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_BURST_WINDOW_MS: u64 = 1_000;
const DEFAULT_MAX_RETRY_AFTER_MS: u64 = 5_000;
const THESPORTSDB_PUBLIC_KEY: &str = "3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub id: ProviderId,
    pub limits: ProviderLimits,
    pub timeout: Duration,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    pub teams: Duration,
    pub players: Duration,
    pub games: Duration,
    pub odds: Duration,
}

impl CacheTtls {
    pub const fn for_data_type(&self, data_type: DataType) -> Duration {
        match data_type {
            DataType::Teams => self.teams,
            DataType::Players => self.players,
            DataType::Games => self.games,
            DataType::Odds => self.odds,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttls: CacheTtls,
    pub stale_retention: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApexConfig {
    /// Providers in priority order.
    pub providers: Vec<ProviderSettings>,
    pub cache: CacheSettings,
    pub rate_limits: RateLimiterSettings,
    pub home: PathBuf,
}

impl ApexConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Lookup(&lookup);

        let tags = env.required("APEX_PROVIDERS")?;
        let mut providers: Vec<ProviderSettings> = Vec::new();
        for tag in tags.split(',').map(str::trim).filter(|tag| !tag.is_empty()) {
            let id = ProviderId::from_str(tag)?;
            if providers.iter().any(|existing| existing.id == id) {
                return Err(ConfigError::DuplicateProvider {
                    provider: id.to_string(),
                });
            }
            providers.push(env.provider(id)?);
        }
        if providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        let cache = CacheSettings {
            ttls: CacheTtls {
                teams: Duration::from_secs(env.required_positive("APEX_CACHE_TTL_TEAMS_SECS")?),
                players: Duration::from_secs(env.required_positive("APEX_CACHE_TTL_PLAYERS_SECS")?),
                games: Duration::from_secs(env.required_positive("APEX_CACHE_TTL_GAMES_SECS")?),
                odds: Duration::from_secs(env.required_positive("APEX_CACHE_TTL_ODDS_SECS")?),
            },
            stale_retention: Duration::from_secs(
                env.optional_number("APEX_CACHE_STALE_RETENTION_SECS")?
                    .unwrap_or(DEFAULT_STALE_RETENTION_SECS),
            ),
        };

        let burst_mode = match env.optional("APEX_BURST_MODE") {
            None => BurstMode::default(),
            Some(value) => parse_burst_mode(&value)?,
        };
        let rate_limits = RateLimiterSettings {
            burst_window: Duration::from_millis(
                env.optional_positive("APEX_BURST_WINDOW_MS")?
                    .unwrap_or(DEFAULT_BURST_WINDOW_MS),
            ),
            burst_mode,
            max_retry_after: Duration::from_millis(
                env.optional_positive("APEX_MAX_RETRY_AFTER_MS")?
                    .unwrap_or(DEFAULT_MAX_RETRY_AFTER_MS),
            ),
        };

        let home = env
            .optional("APEX_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(apex_store::resolve_apex_home);

        Ok(Self {
            providers,
            cache,
            rate_limits,
            home,
        })
    }

    pub fn provider(&self, id: ProviderId) -> Option<&ProviderSettings> {
        self.providers.iter().find(|provider| provider.id == id)
    }

    pub fn priority(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|provider| provider.id).collect()
    }

    pub fn cache_path(&self) -> PathBuf {
        self.home.join("cache").join("cache.duckdb")
    }
}

struct Lookup<'a, F>(&'a F);

impl<F> Lookup<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }

    fn required(&self, name: &str) -> Result<String, ConfigError> {
        self.optional(name).ok_or_else(|| ConfigError::Missing {
            name: name.to_owned(),
        })
    }

    fn optional_number<T: FromStr>(&self, name: &str) -> Result<Option<T>, ConfigError> {
        self.optional(name)
            .map(|value| {
                value.parse::<T>().map_err(|_| ConfigError::Invalid {
                    name: name.to_owned(),
                    value,
                    expected: "non-negative integer",
                })
            })
            .transpose()
    }

    fn optional_positive(&self, name: &str) -> Result<Option<u64>, ConfigError> {
        match self.optional_number::<u64>(name)? {
            Some(0) => Err(ConfigError::Zero {
                name: name.to_owned(),
            }),
            other => Ok(other),
        }
    }

    fn required_positive(&self, name: &str) -> Result<u64, ConfigError> {
        self.optional_positive(name)?.ok_or_else(|| ConfigError::Missing {
            name: name.to_owned(),
        })
    }

    fn required_ceiling(&self, name: &str) -> Result<u32, ConfigError> {
        let value = self.required_positive(name)?;
        u32::try_from(value).map_err(|_| ConfigError::Invalid {
            name: name.to_owned(),
            value: value.to_string(),
            expected: "32-bit request ceiling",
        })
    }

    fn provider(&self, id: ProviderId) -> Result<ProviderSettings, ConfigError> {
        let tag = id.env_tag();
        let limits = ProviderLimits {
            requests_per_minute: self.required_ceiling(&format!("APEX_{tag}_RATE_PER_MINUTE"))?,
            requests_per_day: self.required_ceiling(&format!("APEX_{tag}_RATE_PER_DAY"))?,
            burst_limit: self.required_ceiling(&format!("APEX_{tag}_BURST"))?,
        };
        let timeout_ms = self
            .optional_positive(&format!("APEX_{tag}_TIMEOUT_MS"))?
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        let key_name = format!("APEX_{tag}_API_KEY");
        let api_key = match id {
            ProviderId::Espn => None,
            ProviderId::TheSportsDb => Some(
                self.optional(&key_name)
                    .unwrap_or_else(|| String::from(THESPORTSDB_PUBLIC_KEY)),
            ),
            ProviderId::BallDontLie | ProviderId::OddsApi => Some(self.required(&key_name)?),
        };

        Ok(ProviderSettings {
            id,
            limits,
            timeout: Duration::from_millis(timeout_ms),
            api_key,
        })
    }
}

fn parse_burst_mode(value: &str) -> Result<BurstMode, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "fixed_window" | "fixed" => Ok(BurstMode::FixedWindow),
        "token_bucket" | "gcra" => Ok(BurstMode::TokenBucket),
        _ => Err(ConfigError::Invalid {
            name: String::from("APEX_BURST_MODE"),
            value: value.to_owned(),
            expected: "burst mode (fixed_window or token_bucket)",
        }),
    }
}
