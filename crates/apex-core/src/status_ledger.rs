//! Last-seen game statuses shared across requests and providers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::{CanonicalGame, GameStatus};

/// How long a fixture is remembered after its last accepted report.
pub const DEFAULT_LEDGER_RETENTION: Duration = Duration::from_secs(3 * 24 * 60 * 60);

/// A reported status that would move a game backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAnomaly {
    pub game_id: String,
    pub previous: GameStatus,
    pub reported: GameStatus,
}

#[derive(Debug, Clone, Copy)]
struct Seen {
    status: GameStatus,
    touched_ms: i64,
}

/// Remembers the furthest status observed for each game.
///
/// Games are keyed by sport, date and both team abbreviations so different
/// providers reporting the same fixture share one entry. Records without
/// abbreviations fall back to a provider-scoped id. A fixture with no
/// accepted report for `retention` is forgotten.
pub struct GameStatusLedger {
    seen: Mutex<HashMap<String, Seen>>,
    clock: Arc<dyn Clock>,
    retention: Duration,
}

impl Default for GameStatusLedger {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_LEDGER_RETENTION)
    }
}

impl GameStatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Arc<dyn Clock>, retention: Duration) -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
            clock,
            retention,
        }
    }

    /// Applies the ledger to a fetched batch. Legal transitions are recorded;
    /// regressions keep the previously observed status and are returned.
    /// Idle fixtures are evicted first.
    pub fn reconcile(&self, games: &mut [CanonicalGame]) -> Vec<StatusAnomaly> {
        let now = self.clock.now_ms();
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        self.evict_idle(&mut seen, now);
        let mut anomalies = Vec::new();

        for game in games.iter_mut() {
            let key = ledger_key(game);
            match seen.get(&key).map(|entry| entry.status) {
                Some(previous) if !previous.can_transition_to(game.status) => {
                    tracing::warn!(
                        game_id = %game.id,
                        previous = %previous,
                        reported = %game.status,
                        provider = %game.source,
                        "game status regression rejected"
                    );
                    anomalies.push(StatusAnomaly {
                        game_id: game.id.clone(),
                        previous,
                        reported: game.status,
                    });
                    game.set_status(previous);
                }
                _ => {
                    seen.insert(
                        key,
                        Seen {
                            status: game.status,
                            touched_ms: now,
                        },
                    );
                }
            }
        }

        anomalies
    }

    fn evict_idle(&self, seen: &mut HashMap<String, Seen>, now: i64) {
        let retention_ms = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now.saturating_sub(retention_ms);
        let before = seen.len();
        seen.retain(|_, entry| entry.touched_ms >= cutoff);
        let evicted = before - seen.len();
        if evicted > 0 {
            tracing::debug!(evicted, "forgot idle fixtures");
        }
    }

    /// Status last accepted for `game`.
    pub fn last_seen(&self, game: &CanonicalGame) -> Option<GameStatus> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&ledger_key(game))
            .map(|entry| entry.status)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn ledger_key(game: &CanonicalGame) -> String {
    match (&game.home.team.abbreviation, &game.away.team.abbreviation) {
        (Some(home), Some(away)) => format!(
            "{}:{}:{}@{}",
            game.sport,
            game.date,
            away.as_str(),
            home.as_str()
        ),
        _ => format!("{}:{}", game.source, game.id),
    }
}
