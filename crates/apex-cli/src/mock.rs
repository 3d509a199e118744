//! Offline mode: canned provider responses and built-in configuration.

use apex_core::{ApexConfig, ConfigError, HttpResponse, StaticHttpClient};
use serde_json::json;

/// Configuration used by `--mock`. Real environment values still win so a
/// single setting can be overridden.
pub fn config() -> Result<ApexConfig, ConfigError> {
    ApexConfig::from_lookup(|name| std::env::var(name).ok().or_else(|| default_setting(name)))
}

fn default_setting(name: &str) -> Option<String> {
    let value = match name {
        "APEX_PROVIDERS" => "espn,balldontlie,thesportsdb,oddsapi",
        "APEX_CACHE_TTL_TEAMS_SECS" => "86400",
        "APEX_CACHE_TTL_PLAYERS_SECS" => "3600",
        "APEX_CACHE_TTL_GAMES_SECS" => "60",
        "APEX_CACHE_TTL_ODDS_SECS" => "30",
        "APEX_BALLDONTLIE_API_KEY" | "APEX_ODDSAPI_API_KEY" => "mock-key",
        _ if name.ends_with("_RATE_PER_MINUTE") => "60",
        _ if name.ends_with("_RATE_PER_DAY") => "1000",
        _ if name.ends_with("_BURST") => "10",
        _ => return None,
    };
    Some(String::from(value))
}

/// Static transport answering the most common provider routes.
///
/// Routes are matched by URL substring in order, so the specific ESPN paths
/// precede the catch-all for its team listings.
pub fn http_client() -> StaticHttpClient {
    StaticHttpClient::new()
        .with_json("/roster", espn_roster().to_string())
        .with_json("/scoreboard", espn_scoreboard().to_string())
        .with_json("api.balldontlie.io/v1/players", balldontlie_players().to_string())
        .with_json("/odds?", odds_events().to_string())
        .with_response("/scores?", HttpResponse::with_status(503, "{}"))
        .with_json("site.api.espn.com", espn_teams().to_string())
}

fn espn_teams() -> serde_json::Value {
    json!({"sports": [{"leagues": [{"teams": [
        {"team": {
            "id": "13",
            "location": "Los Angeles",
            "displayName": "Los Angeles Lakers",
            "abbreviation": "LAL",
            "logos": [{"href": "https://a.espncdn.com/i/teamlogos/nba/500/lal.png"}],
            "record": {"items": [{"summary": "30-10"}]}
        }},
        {"team": {
            "id": "2",
            "location": "Boston",
            "displayName": "Boston Celtics",
            "abbreviation": "BOS",
            "logos": [{"href": "https://a.espncdn.com/i/teamlogos/nba/500/bos.png"}],
            "record": {"items": [{"summary": "32-9"}]}
        }}
    ]}]}]})
}

fn espn_roster() -> serde_json::Value {
    json!({"athletes": [
        {
            "id": "1966",
            "fullName": "LeBron James",
            "firstName": "LeBron",
            "lastName": "James",
            "jersey": "23",
            "position": {"abbreviation": "F"},
            "displayHeight": "6' 9\"",
            "displayWeight": "250 lbs",
            "age": 39
        },
        {
            "id": "6583",
            "fullName": "Anthony Davis",
            "firstName": "Anthony",
            "lastName": "Davis",
            "jersey": "3",
            "position": {"abbreviation": "F-C"},
            "age": 30
        }
    ]})
}

fn espn_scoreboard() -> serde_json::Value {
    json!({"events": [{
        "id": "401585601",
        "date": "2024-01-15T00:30Z",
        "season": {"year": 2024, "type": 2},
        "status": {"type": {"name": "STATUS_FINAL"}},
        "competitions": [{
            "venue": {"fullName": "Crypto.com Arena"},
            "broadcasts": [{"names": ["TNT"]}],
            "competitors": [
                {"homeAway": "home", "score": "112",
                 "team": {"id": "13", "displayName": "Los Angeles Lakers", "abbreviation": "LAL"}},
                {"homeAway": "away", "score": "105",
                 "team": {"id": "2", "displayName": "Boston Celtics", "abbreviation": "BOS"}}
            ]
        }]
    }]})
}

fn balldontlie_players() -> serde_json::Value {
    json!({"data": [{
        "id": 237,
        "first_name": "LeBron",
        "last_name": "James",
        "position": "F",
        "height": "6-9",
        "weight": "250",
        "jersey_number": "23",
        "team": {"id": 14, "full_name": "Los Angeles Lakers", "abbreviation": "LAL"}
    }], "meta": {"per_page": 100}})
}

fn odds_events() -> serde_json::Value {
    json!([{
        "id": "e912304de2b2ce35b473ce2ecd3d1502",
        "sport_key": "basketball_nba",
        "commence_time": "2024-01-16T00:30:00Z",
        "home_team": "Boston Celtics",
        "away_team": "Los Angeles Lakers",
        "bookmakers": [{
            "key": "draftkings",
            "title": "DraftKings",
            "last_update": "2024-01-15T18:00:00Z",
            "markets": [
                {"key": "h2h", "outcomes": [
                    {"name": "Boston Celtics", "price": -180},
                    {"name": "Los Angeles Lakers", "price": 150}
                ]},
                {"key": "spreads", "outcomes": [
                    {"name": "Boston Celtics", "price": -110, "point": -4.5},
                    {"name": "Los Angeles Lakers", "price": -110, "point": 4.5}
                ]},
                {"key": "totals", "outcomes": [
                    {"name": "Over", "price": -110, "point": 229.5},
                    {"name": "Under", "price": -110, "point": 229.5}
                ]}
            ]
        }]
    }])
}
