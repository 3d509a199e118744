use std::sync::Arc;

use serde_json::Value;

use super::normalize::{
    bool_at, derive_city, expand_team_alias, parse_date, parse_status, player_names,
    resolve_abbreviation, str_at, team_ref, u32_at,
};
use super::{execute_json, records_at};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{FetchFuture, ProviderAdapter, SourceError};
use crate::{
    CanonicalGame, CanonicalPlayer, CanonicalTeam, DataRequest, DataType, GameSide,
    NormalizationError, PhysicalAttributes, ProviderId, Sport, UtcDateTime,
};

const DEFAULT_BASE_URL: &str = "https://www.thesportsdb.com/api/v1/json";
const PROVIDER: ProviderId = ProviderId::TheSportsDb;

/// TheSportsDB. The API key is a path segment; records use `str*`/`int*` fields.
#[derive(Clone)]
pub struct TheSportsDbAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    timeout_ms: u64,
}

impl TheSportsDbAdapter {
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

    const fn league_name(sport: Sport) -> &'static str {
        match sport {
            Sport::Basketball => "NBA",
            Sport::Football => "NFL",
            Sport::Baseball => "MLB",
            Sport::Hockey => "NHL",
            Sport::Soccer => "American Major League Soccer",
        }
    }

    const fn league_id(sport: Sport) -> &'static str {
        match sport {
            Sport::Basketball => "4387",
            Sport::Football => "4391",
            Sport::Baseball => "4424",
            Sport::Hockey => "4380",
            Sport::Soccer => "4346",
        }
    }

    fn plan(&self, request: &DataRequest) -> Result<(HttpRequest, &'static str), SourceError> {
        let root = format!("{}/{}", self.base_url, urlencoding::encode(&self.api_key));
        let sport = request.sport;

        let planned = match request.data_type {
            DataType::Teams => (
                HttpRequest::get(format!("{root}/search_all_teams.php"))
                    .with_query("l", Self::league_name(sport)),
                "/teams",
            ),
            DataType::Players => match (request.filter("team"), request.filter("search")) {
                (Some(team), _) => (
                    HttpRequest::get(format!("{root}/lookup_all_players.php")).with_query("id", team),
                    "/player",
                ),
                (None, Some(search)) => (
                    HttpRequest::get(format!("{root}/searchplayers.php")).with_query("p", search),
                    "/player",
                ),
                (None, None) => {
                    return Err(SourceError::invalid_request(
                        "thesportsdb player lookups need a 'team' or 'search' filter",
                    ))
                }
            },
            DataType::Games => match (request.filter("date"), request.filter("team")) {
                (Some(date), _) => (
                    HttpRequest::get(format!("{root}/eventsday.php"))
                        .with_query("d", date)
                        .with_query("l", Self::league_name(sport)),
                    "/events",
                ),
                (None, Some(team)) => (
                    HttpRequest::get(format!("{root}/eventsnext.php")).with_query("id", team),
                    "/events",
                ),
                (None, None) => (
                    HttpRequest::get(format!("{root}/eventsnextleague.php"))
                        .with_query("id", Self::league_id(sport)),
                    "/events",
                ),
            },
            DataType::Odds => {
                return Err(SourceError::unsupported(PROVIDER, sport, request.data_type))
            }
        };
        Ok(planned)
    }
}

impl ProviderAdapter for TheSportsDbAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn supports(&self, _sport: Sport, data_type: DataType) -> bool {
        data_type != DataType::Odds
    }

    fn fetch<'a>(&'a self, request: &'a DataRequest) -> FetchFuture<'a> {
        Box::pin(async move {
            let (http_request, pointer) = self.plan(request)?;
            let body = execute_json(
                self.http_client.as_ref(),
                PROVIDER,
                http_request.with_timeout_ms(self.timeout_ms),
            )
            .await?;
            records_at(&body, pointer, PROVIDER)
        })
    }

    fn normalize_team(&self, raw: &Value, sport: Sport) -> Result<CanonicalTeam, NormalizationError> {
        let id = str_at(raw, "/idTeam").ok_or_else(|| NormalizationError::missing(PROVIDER, "idTeam"))?;
        let name = str_at(raw, "/strTeam")
            .map(|name| expand_team_alias(&name))
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "strTeam"))?;
        let city = derive_city(&name);
        let abbreviation =
            resolve_abbreviation(str_at(raw, "/strTeamShort").as_deref(), &name, &city)
                .ok_or_else(|| {
                    NormalizationError::new(PROVIDER, "strTeamShort", "cannot derive from name")
                })?;
        let league = match str_at(raw, "/strLeague") {
            Some(league) if league != Self::league_name(sport) => league,
            _ => String::from(sport.default_league()),
        };

        Ok(CanonicalTeam {
            id,
            name,
            city,
            abbreviation,
            conference: None,
            division: str_at(raw, "/strDivision"),
            league,
            sport,
            logo_url: str_at(raw, "/strBadge").or_else(|| str_at(raw, "/strTeamBadge")),
            founded: u32_at(raw, "/intFormedYear").and_then(|year| u16::try_from(year).ok()),
            record: None,
            source: PROVIDER,
            last_updated: UtcDateTime::now(),
        })
    }

    fn normalize_player(
        &self,
        raw: &Value,
        sport: Sport,
    ) -> Result<CanonicalPlayer, NormalizationError> {
        let id =
            str_at(raw, "/idPlayer").ok_or_else(|| NormalizationError::missing(PROVIDER, "idPlayer"))?;
        let (full_name, first_name, last_name) = player_names(str_at(raw, "/strPlayer"), None, None)
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "strPlayer"))?;

        Ok(CanonicalPlayer {
            id,
            full_name,
            first_name,
            last_name,
            position: str_at(raw, "/strPosition"),
            jersey_number: str_at(raw, "/strNumber"),
            team: team_ref(str_at(raw, "/idTeam"), str_at(raw, "/strTeam"), None),
            physical: PhysicalAttributes {
                height: str_at(raw, "/strHeight"),
                weight: str_at(raw, "/strWeight"),
                age: None,
            },
            active: bool_at(raw, "/strStatus").unwrap_or(true),
            sport,
            source: PROVIDER,
            last_updated: UtcDateTime::now(),
        })
    }

    fn normalize_game(&self, raw: &Value, sport: Sport) -> Result<CanonicalGame, NormalizationError> {
        let id =
            str_at(raw, "/idEvent").ok_or_else(|| NormalizationError::missing(PROVIDER, "idEvent"))?;
        let date_text = str_at(raw, "/dateEvent")
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "dateEvent"))?;
        let (date, _) = parse_date(&date_text).ok_or_else(|| {
            NormalizationError::new(
                PROVIDER,
                "dateEvent",
                format!("unrecognized date '{date_text}'"),
            )
        })?;
        let start_time = str_at(raw, "/strTime").and_then(|time| {
            let clock = time.get(..8).unwrap_or(time.as_str());
            parse_date(&format!("{date_text} {clock}")).and_then(|(_, instant)| instant)
        });

        let status = if str_at(raw, "/strPostponed").is_some_and(|flag| flag.eq_ignore_ascii_case("yes")) {
            crate::GameStatus::Postponed
        } else {
            str_at(raw, "/strStatus").map_or(crate::GameStatus::Scheduled, |text| parse_status(&text))
        };

        let home = GameSide {
            team: team_ref(str_at(raw, "/idHomeTeam"), str_at(raw, "/strHomeTeam"), None),
            score: u32_at(raw, "/intHomeScore"),
        };
        let away = GameSide {
            team: team_ref(str_at(raw, "/idAwayTeam"), str_at(raw, "/strAwayTeam"), None),
            score: u32_at(raw, "/intAwayScore"),
        };
        if home.team.is_empty() || away.team.is_empty() {
            return Err(NormalizationError::missing(PROVIDER, "strHomeTeam/strAwayTeam"));
        }

        Ok(CanonicalGame::new(id, date, status, home, away, sport, PROVIDER)
            .with_start_time(start_time)
            .with_season(str_at(raw, "/strSeason"))
            .with_venue(str_at(raw, "/strVenue")))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http_client::StaticHttpClient;
    use crate::GameStatus;

    fn adapter() -> TheSportsDbAdapter {
        TheSportsDbAdapter::new(Arc::new(StaticHttpClient::new()), "3")
    }

    #[tokio::test]
    async fn key_travels_in_the_path() {
        let client = Arc::new(StaticHttpClient::new().with_json(
            "search_all_teams.php",
            json!({"teams": null}).to_string(),
        ));
        let adapter = TheSportsDbAdapter::new(client.clone(), "3");
        let request = DataRequest::new(DataType::Teams, Sport::Hockey);

        let records = adapter.fetch(&request).await.expect("fetch succeeds");
        assert!(records.is_empty());
        assert_eq!(
            client.requests()[0].url,
            "https://www.thesportsdb.com/api/v1/json/3/search_all_teams.php?l=NHL"
        );
    }

    #[test]
    fn derives_city_and_abbreviation_when_absent() {
        let raw = json!({
            "idTeam": "134867",
            "strTeam": "Los Angeles Lakers",
            "strLeague": "NBA",
            "intFormedYear": "1947",
            "strBadge": "https://r2.thesportsdb.com/lakers.png"
        });

        let team = adapter().normalize_team(&raw, Sport::Basketball).expect("team");
        assert_eq!(team.city, "Los Angeles");
        assert_eq!(team.abbreviation.as_str(), "LAL");
        assert_eq!(team.league, "NBA");
        assert_eq!(team.founded, Some(1947));
    }

    #[test]
    fn normalizes_finished_event_with_string_scores() {
        let raw = json!({
            "idEvent": "1903457",
            "dateEvent": "2024-01-15",
            "strTime": "00:30:00",
            "strSeason": "2023-2024",
            "strStatus": "Match Finished",
            "strPostponed": "no",
            "idHomeTeam": "134867",
            "strHomeTeam": "Los Angeles Lakers",
            "intHomeScore": "112",
            "idAwayTeam": "134860",
            "strAwayTeam": "Boston Celtics",
            "intAwayScore": "105",
            "strVenue": "Crypto.com Arena"
        });

        let game = adapter().normalize_game(&raw, Sport::Basketball).expect("game");
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!((game.home.score, game.away.score), (Some(112), Some(105)));
        assert_eq!(
            game.start_time.map(UtcDateTime::format_rfc3339).as_deref(),
            Some("2024-01-15T00:30:00Z")
        );
        assert_eq!(
            game.home.team.abbreviation.map(|abbreviation| abbreviation.as_str().to_owned()),
            Some(String::from("LAL"))
        );
    }

    #[test]
    fn postponed_flag_overrides_status_text() {
        let raw = json!({
            "idEvent": "1",
            "dateEvent": "2024-01-15",
            "strStatus": "Not Started",
            "strPostponed": "yes",
            "strHomeTeam": "Toronto Raptors",
            "strAwayTeam": "Miami Heat"
        });

        let game = adapter().normalize_game(&raw, Sport::Basketball).expect("game");
        assert_eq!(game.status, GameStatus::Postponed);
    }

    #[test]
    fn unparseable_date_is_a_field_error() {
        let raw = json!({"idEvent": "1", "dateEvent": "someday"});
        let error = adapter().normalize_game(&raw, Sport::Basketball).expect_err("bad date");
        assert_eq!(error.field, "dateEvent");
    }
}
