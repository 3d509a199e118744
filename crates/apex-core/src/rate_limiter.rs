//! Per-provider request budgets.
//!
//! Minute and day budgets are fixed windows aligned to the wall clock
//! (`floor(now_ms / window_ms)`). The burst tier is either another fixed
//! window (default) or a GCRA token bucket.
//!
//! Fixed windows admit up to twice a window's ceiling across a boundary:
//! a full window's worth just before the boundary and another just after.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use governor::clock::{Clock as GovernorClock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter as GovernorLimiter};
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::config::ApexConfig;
use crate::retry::Backoff;
use crate::{ApexError, ProviderId};

const MINUTE_MS: i64 = 60_000;
const DAY_MS: i64 = 86_400_000;

type DirectRateLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Ceilings for one provider. All must be non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderLimits {
    pub requests_per_minute: u32,
    pub requests_per_day: u32,
    pub burst_limit: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurstMode {
    #[default]
    FixedWindow,
    TokenBucket,
}

impl BurstMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FixedWindow => "fixed_window",
            Self::TokenBucket => "token_bucket",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterSettings {
    pub burst_window: Duration,
    pub burst_mode: BurstMode,
    pub max_retry_after: Duration,
}

impl Default for RateLimiterSettings {
    fn default() -> Self {
        Self {
            burst_window: Duration::from_secs(1),
            burst_mode: BurstMode::FixedWindow,
            max_retry_after: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateWindow {
    Minute,
    Day,
    Burst,
}

impl RateWindow {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Day => "day",
            Self::Burst => "burst",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Allowed,
    Denied {
        window: RateWindow,
        retry_after: Duration,
    },
}

impl Reservation {
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Counter usage for the `sources` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub provider: ProviderId,
    pub limits: ProviderLimits,
    pub minute_used: u32,
    pub day_used: u32,
    pub burst_used: u32,
    pub burst_mode: BurstMode,
}

#[derive(Debug, Clone, Copy)]
struct WindowCounter {
    bucket: i64,
    count: u32,
}

impl WindowCounter {
    const fn new() -> Self {
        Self {
            bucket: i64::MIN,
            count: 0,
        }
    }

    /// Count within `bucket`, resetting when the window has rolled over.
    fn roll(&mut self, bucket: i64) -> u32 {
        if self.bucket != bucket {
            self.bucket = bucket;
            self.count = 0;
        }
        self.count
    }

    fn peek(&self, bucket: i64) -> u32 {
        if self.bucket == bucket {
            self.count
        } else {
            0
        }
    }
}

struct RateBudget {
    limits: ProviderLimits,
    minute: WindowCounter,
    day: WindowCounter,
    burst: WindowCounter,
    token_bucket: Option<DirectRateLimiter>,
}

/// Gatekeeper for every outbound provider call.
///
/// Each provider owns one mutex-guarded budget; the provider map is fixed at
/// construction, so reservations for different providers never contend.
pub struct RateLimiter {
    budgets: HashMap<ProviderId, Mutex<RateBudget>>,
    settings: RateLimiterSettings,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(
        limits: impl IntoIterator<Item = (ProviderId, ProviderLimits)>,
        settings: RateLimiterSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let burst_window_ms = window_ms(settings.burst_window);
        let budgets = limits
            .into_iter()
            .map(|(provider, limits)| {
                let token_bucket = match settings.burst_mode {
                    BurstMode::FixedWindow => None,
                    BurstMode::TokenBucket => Some(GovernorLimiter::direct(burst_quota(
                        settings.burst_window,
                        limits.burst_limit,
                    ))),
                };
                let budget = RateBudget {
                    limits,
                    minute: WindowCounter::new(),
                    day: WindowCounter::new(),
                    burst: WindowCounter::new(),
                    token_bucket,
                };
                (provider, Mutex::new(budget))
            })
            .collect();

        tracing::debug!(burst_window_ms, burst_mode = settings.burst_mode.as_str(), "rate limiter ready");

        Self {
            budgets,
            settings,
            clock,
        }
    }

    /// Budgets for every configured provider.
    pub fn from_config(config: &ApexConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            config
                .providers
                .iter()
                .map(|provider| (provider.id, provider.limits)),
            config.rate_limits,
            clock,
        )
    }

    /// Takes one slot from every tier, or reports the most restrictive
    /// exhausted tier without consuming anything.
    pub fn reserve(&self, provider: ProviderId) -> Result<Reservation, ApexError> {
        let budget = self
            .budgets
            .get(&provider)
            .ok_or_else(|| ApexError::UnknownProvider {
                provider: provider.to_string(),
            })?;
        let mut budget = budget.lock().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now_ms();
        let limits = budget.limits;
        let minute_bucket = now.div_euclid(MINUTE_MS);
        let day_bucket = now.div_euclid(DAY_MS);
        let burst_bucket = now.div_euclid(window_ms(self.settings.burst_window));

        let mut denial: Option<(RateWindow, Duration)> = None;
        let mut deny = |window: RateWindow, wait: Duration| {
            if denial.map_or(true, |(_, current)| wait > current) {
                denial = Some((window, wait));
            }
        };

        if budget.minute.roll(minute_bucket) >= limits.requests_per_minute {
            deny(
                RateWindow::Minute,
                Duration::from_secs(60) / limits.requests_per_minute.max(1),
            );
        }
        if budget.day.roll(day_bucket) >= limits.requests_per_day {
            deny(
                RateWindow::Day,
                Duration::from_secs(86_400) / limits.requests_per_day.max(1),
            );
        }
        let burst_used = budget.burst.roll(burst_bucket);
        if budget.token_bucket.is_none() && burst_used >= limits.burst_limit {
            deny(
                RateWindow::Burst,
                self.settings.burst_window / limits.burst_limit.max(1),
            );
        }

        if let Some((window, wait)) = denial {
            return Ok(self.denied(provider, window, wait));
        }

        if let Some(token_bucket) = &budget.token_bucket {
            if let Err(not_until) = token_bucket.check() {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                return Ok(self.denied(provider, RateWindow::Burst, wait));
            }
        }

        budget.minute.count += 1;
        budget.day.count += 1;
        budget.burst.count += 1;
        tracing::debug!(
            provider = %provider,
            minute_used = budget.minute.count,
            day_used = budget.day.count,
            "rate budget reserved"
        );

        Ok(Reservation::Allowed)
    }

    fn denied(&self, provider: ProviderId, window: RateWindow, wait: Duration) -> Reservation {
        let retry_after = wait.min(self.settings.max_retry_after);
        tracing::debug!(
            provider = %provider,
            window = window.as_str(),
            retry_after_ms = retry_after.as_millis() as u64,
            "rate budget denied"
        );
        Reservation::Denied {
            window,
            retry_after,
        }
    }

    /// Reserves, sleeping between denied attempts.
    ///
    /// Minute and day denials wait `retry_after`; burst denials wait with a
    /// jittered doubling backoff starting at `burst_window / burst_limit`.
    pub async fn reserve_with_retry(
        &self,
        provider: ProviderId,
        max_attempts: u32,
    ) -> Result<(), ApexError> {
        let max_attempts = max_attempts.max(1);
        let backoff = self.burst_backoff(provider);
        let mut burst_retries = 0;
        let mut last_retry_after = Duration::ZERO;

        for attempt in 1..=max_attempts {
            let (window, retry_after) = match self.reserve(provider)? {
                Reservation::Allowed => return Ok(()),
                Reservation::Denied {
                    window,
                    retry_after,
                } => (window, retry_after),
            };
            last_retry_after = retry_after;

            if attempt == max_attempts {
                break;
            }

            let wait = match window {
                RateWindow::Burst => {
                    let wait = backoff.delay(burst_retries);
                    burst_retries += 1;
                    wait
                }
                RateWindow::Minute | RateWindow::Day => retry_after,
            };
            tokio::time::sleep(wait).await;
        }

        Err(ApexError::RateLimitExceeded {
            provider,
            attempts: max_attempts,
            retry_after_ms: u64::try_from(last_retry_after.as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn burst_backoff(&self, provider: ProviderId) -> Backoff {
        let burst_limit = self
            .budgets
            .get(&provider)
            .map(|budget| {
                budget
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .limits
                    .burst_limit
            })
            .unwrap_or(1);

        Backoff {
            base: self.settings.burst_window / burst_limit.max(1),
            factor: 2.0,
            max: self.settings.max_retry_after,
            jitter: true,
        }
    }

    pub fn snapshot(&self, provider: ProviderId) -> Option<BudgetSnapshot> {
        let budget = self
            .budgets
            .get(&provider)?
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now_ms();

        Some(BudgetSnapshot {
            provider,
            limits: budget.limits,
            minute_used: budget.minute.peek(now.div_euclid(MINUTE_MS)),
            day_used: budget.day.peek(now.div_euclid(DAY_MS)),
            burst_used: budget
                .burst
                .peek(now.div_euclid(window_ms(self.settings.burst_window))),
            burst_mode: self.settings.burst_mode,
        })
    }
}

fn window_ms(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX).max(1)
}

fn burst_quota(window: Duration, burst_limit: u32) -> Quota {
    let burst = NonZeroU32::new(burst_limit.max(1)).unwrap_or(NonZeroU32::MIN);
    let period = (window / burst.get()).max(Duration::from_millis(1));

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
