use std::sync::Arc;

use serde_json::Value;

use super::normalize::{
    expand_team_alias, parse_date, parse_line, parse_moneyline, str_at, team_ref, u32_at,
};
use super::{execute_json, records_at};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider::{FetchFuture, ProviderAdapter, SourceError};
use crate::{
    CanonicalGame, CanonicalOdds, CanonicalPlayer, CanonicalTeam, DataRequest, DataType, GameSide,
    GameStatus, NormalizationError, ProviderId, Sport, UtcDateTime,
};

const DEFAULT_BASE_URL: &str = "https://api.the-odds-api.com/v4";
const PROVIDER: ProviderId = ProviderId::OddsApi;

/// The Odds API. Odds and scores for every sport; key sent as `apiKey`.
#[derive(Clone)]
pub struct OddsApiAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    timeout_ms: u64,
}

impl OddsApiAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            api_key: api_key.into(),
            base_url: String::from(DEFAULT_BASE_URL),
            timeout_ms: 5_000,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    const fn sport_key(sport: Sport) -> &'static str {
        match sport {
            Sport::Basketball => "basketball_nba",
            Sport::Football => "americanfootball_nfl",
            Sport::Baseball => "baseball_mlb",
            Sport::Hockey => "icehockey_nhl",
            Sport::Soccer => "soccer_usa_mls",
        }
    }

    fn build_request(&self, request: &DataRequest) -> Result<HttpRequest, SourceError> {
        let root = format!("{}/sports/{}", self.base_url, Self::sport_key(request.sport));
        let http_request = match request.data_type {
            DataType::Odds => HttpRequest::get(format!("{root}/odds"))
                .with_query("regions", "us")
                .with_query("markets", "h2h,spreads,totals")
                .with_query("oddsFormat", "american"),
            DataType::Games => HttpRequest::get(format!("{root}/scores")).with_query("daysFrom", "3"),
            DataType::Teams | DataType::Players => {
                return Err(SourceError::unsupported(
                    PROVIDER,
                    request.sport,
                    request.data_type,
                ))
            }
        };

        Ok(http_request
            .with_auth(&HttpAuth::QueryParam {
                name: String::from("apiKey"),
                value: self.api_key.clone(),
            })
            .with_timeout_ms(self.timeout_ms))
    }
}

/// Prices and points arrive as numbers or as display strings.
fn odds_number(value: Option<&Value>, parse: fn(&str) -> Option<f64>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => parse(text),
        _ => None,
    }
}

fn market_outcomes<'a>(bookmaker: &'a Value, market: &str) -> &'a [Value] {
    bookmaker
        .get("markets")
        .and_then(Value::as_array)
        .and_then(|markets| {
            markets
                .iter()
                .find(|entry| entry.get("key").and_then(Value::as_str) == Some(market))
        })
        .and_then(|entry| entry.get("outcomes"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn outcome_named<'a>(outcomes: &'a [Value], name: &str) -> Option<&'a Value> {
    outcomes.iter().find(|outcome| {
        outcome
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
    })
}

impl ProviderAdapter for OddsApiAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn supports(&self, _sport: Sport, data_type: DataType) -> bool {
        matches!(data_type, DataType::Odds | DataType::Games)
    }

    fn fetch<'a>(&'a self, request: &'a DataRequest) -> FetchFuture<'a> {
        Box::pin(async move {
            let http_request = self.build_request(request)?;
            let body = execute_json(self.http_client.as_ref(), PROVIDER, http_request).await?;
            let records = records_at(&body, "", PROVIDER)?;

            // The scores endpoint has no team filter of its own.
            Ok(match request.filter("team") {
                Some(team) => records
                    .into_iter()
                    .filter(|record| {
                        ["/home_team", "/away_team"].iter().any(|pointer| {
                            str_at(record, pointer)
                                .is_some_and(|name| name.eq_ignore_ascii_case(team))
                        })
                    })
                    .collect(),
                None => records,
            })
        })
    }

    fn normalize_team(&self, _raw: &Value, _sport: Sport) -> Result<CanonicalTeam, NormalizationError> {
        Err(NormalizationError::new(
            PROVIDER,
            "teams",
            "provider does not publish team records",
        ))
    }

    fn normalize_player(
        &self,
        _raw: &Value,
        _sport: Sport,
    ) -> Result<CanonicalPlayer, NormalizationError> {
        Err(NormalizationError::new(
            PROVIDER,
            "players",
            "provider does not publish player records",
        ))
    }

    fn normalize_game(&self, raw: &Value, sport: Sport) -> Result<CanonicalGame, NormalizationError> {
        let id = str_at(raw, "/id").ok_or_else(|| NormalizationError::missing(PROVIDER, "id"))?;
        let home_name = str_at(raw, "/home_team")
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "home_team"))?;
        let away_name = str_at(raw, "/away_team")
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "away_team"))?;
        let commence = str_at(raw, "/commence_time")
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "commence_time"))?;
        let (date, start_time) = parse_date(&commence).ok_or_else(|| {
            NormalizationError::new(
                PROVIDER,
                "commence_time",
                format!("unrecognized date '{commence}'"),
            )
        })?;

        let scores = raw.get("scores").and_then(Value::as_array);
        let score_for = |name: &str| {
            scores
                .and_then(|scores| outcome_named(scores, name))
                .and_then(|entry| u32_at(entry, "/score"))
        };
        let home = GameSide {
            score: score_for(&home_name),
            team: team_ref(None, Some(home_name), None),
        };
        let away = GameSide {
            score: score_for(&away_name),
            team: team_ref(None, Some(away_name), None),
        };

        let status = match raw.get("completed").and_then(Value::as_bool) {
            Some(true) => GameStatus::Finished,
            _ if scores.is_some_and(|scores| !scores.is_empty()) => GameStatus::Live,
            _ => GameStatus::Scheduled,
        };

        Ok(CanonicalGame::new(id, date, status, home, away, sport, PROVIDER).with_start_time(start_time))
    }

    fn normalize_odds(&self, raw: &Value, sport: Sport) -> Result<CanonicalOdds, NormalizationError> {
        // Outcomes name teams exactly as the event does; aliases are
        // expanded only in the canonical record.
        let home_name = str_at(raw, "/home_team")
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "home_team"))?;
        let away_name = str_at(raw, "/away_team")
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "away_team"))?;
        let bookmaker = raw
            .pointer("/bookmakers/0")
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "bookmakers"))?;

        let moneyline = market_outcomes(bookmaker, "h2h");
        let spreads = market_outcomes(bookmaker, "spreads");
        let totals = market_outcomes(bookmaker, "totals");

        let home_moneyline =
            outcome_named(moneyline, &home_name).and_then(|o| odds_number(o.get("price"), parse_moneyline));
        let away_moneyline =
            outcome_named(moneyline, &away_name).and_then(|o| odds_number(o.get("price"), parse_moneyline));
        let spread =
            outcome_named(spreads, &home_name).and_then(|o| odds_number(o.get("point"), parse_line));
        let total = outcome_named(totals, "Over").and_then(|o| odds_number(o.get("point"), parse_line));

        if [home_moneyline, away_moneyline, spread, total]
            .iter()
            .all(Option::is_none)
        {
            return Err(NormalizationError::new(
                PROVIDER,
                "bookmakers.markets",
                "no usable price in any market",
            ));
        }

        Ok(CanonicalOdds {
            game_id: str_at(raw, "/id"),
            home_team: expand_team_alias(&home_name),
            away_team: expand_team_alias(&away_name),
            home_moneyline,
            away_moneyline,
            spread,
            total,
            bookmaker: str_at(bookmaker, "/title")
                .or_else(|| str_at(bookmaker, "/key"))
                .unwrap_or_else(|| String::from("unknown")),
            commence_time: str_at(raw, "/commence_time")
                .and_then(|text| parse_date(&text))
                .and_then(|(_, instant)| instant),
            sport,
            source: PROVIDER,
            last_updated: UtcDateTime::now(),
        })
    }
}
