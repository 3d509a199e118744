//! CLI argument definitions for apex.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch` | Read teams, players, games or odds through the orchestrator |
//! | `cache` | Inspect and maintain the response cache |
//! | `sources` | Provider priority, capabilities and rate budgets |
//!
//! # Examples
//!
//! ```bash
//! apex fetch teams --sport nba --pretty
//! apex fetch games --sport nfl --filter date=2024-01-14
//! apex fetch odds --sport nba --force-refresh
//! apex cache stats
//! apex --mock sources
//! ```

use clap::{Args, Parser, Subcommand};

/// Provider-neutral sports data CLI.
///
/// Serves canonical teams, players, games and odds from a two-tier cache,
/// falling back across ESPN, balldontlie, TheSportsDB and The Odds API.
#[derive(Debug, Parser)]
#[command(name = "apex", author, version, about = "Provider-neutral sports data CLI")]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    /// Answer from canned provider responses instead of the network.
    ///
    /// Uses built-in configuration defaults and an in-memory cache.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch canonical records.
    ///
    /// # Examples
    ///
    ///   apex fetch teams --sport nba
    ///   apex fetch players --sport nfl --filter team=12
    ///   apex fetch games --sport nba --filter date=2024-01-15 --force-refresh
    Fetch(FetchArgs),

    /// Cache management commands.
    Cache(CacheArgs),

    /// List configured providers with their capabilities and budgets.
    Sources,
}

/// Request shape shared by `fetch` and `cache key`.
#[derive(Debug, Clone, Args)]
pub struct RequestArgs {
    /// Data type: teams, players, games or odds.
    pub data_type: String,

    /// Sport or league alias (basketball/nba, football/nfl, baseball/mlb,
    /// hockey/nhl, soccer/mls).
    #[arg(long)]
    pub sport: String,

    /// Filter written as key=value (team, date, season, search). Repeatable.
    #[arg(long = "filter", value_name = "KEY=VALUE")]
    pub filters: Vec<String>,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Skip the cache read and go straight to providers.
    #[arg(long, default_value_t = false)]
    pub force_refresh: bool,
}

#[derive(Debug, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// Hit/miss counters and entry totals.
    Stats,
    /// Remove every cached entry.
    Clear,
    /// Remove one entry by cache key.
    Delete {
        key: String,
    },
    /// Reclaim entries past their stale retention.
    Sweep,
    /// Print the cache key a request would use.
    Key(RequestArgs),
}
