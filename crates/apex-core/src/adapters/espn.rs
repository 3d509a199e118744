use std::sync::Arc;

use serde_json::Value;

use super::normalize::{
    bool_at, derive_city, expand_team_alias, parse_date, parse_game_type, parse_record,
    parse_status, player_names, resolve_abbreviation, str_at, team_ref, u32_at,
};
use super::{execute_json, records_at};
use crate::http_client::{HttpClient, HttpRequest};
use crate::provider::{FetchFuture, ProviderAdapter, SourceError};
use crate::{
    CanonicalGame, CanonicalPlayer, CanonicalTeam, DataRequest, DataType, GameSide, GameType,
    NormalizationError, PhysicalAttributes, ProviderId, Sport, UtcDateTime,
};

const DEFAULT_BASE_URL: &str = "https://site.api.espn.com/apis/site/v2/sports";
const PROVIDER: ProviderId = ProviderId::Espn;

/// ESPN public site API. No credentials; every sport; no odds.
#[derive(Clone)]
pub struct EspnAdapter {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    timeout_ms: u64,
}

impl EspnAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
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

    const fn league_path(sport: Sport) -> &'static str {
        match sport {
            Sport::Basketball => "basketball/nba",
            Sport::Football => "football/nfl",
            Sport::Baseball => "baseball/mlb",
            Sport::Hockey => "hockey/nhl",
            Sport::Soccer => "soccer/usa.1",
        }
    }

    /// Request plus the JSON pointer of the record array in the answer.
    fn plan(&self, request: &DataRequest) -> Result<(HttpRequest, &'static str), SourceError> {
        let root = format!("{}/{}", self.base_url, Self::league_path(request.sport));
        let planned = match request.data_type {
            DataType::Teams => (
                HttpRequest::get(format!("{root}/teams")),
                "/sports/0/leagues/0/teams",
            ),
            DataType::Players => {
                let team = request.filter("team").ok_or_else(|| {
                    SourceError::invalid_request("espn player lookups need a 'team' filter")
                })?;
                (
                    HttpRequest::get(format!("{root}/teams/{}/roster", urlencoding::encode(team))),
                    "/athletes",
                )
            }
            DataType::Games => {
                let mut http_request = HttpRequest::get(format!("{root}/scoreboard"));
                if let Some(date) = request.filter("date") {
                    http_request = http_request.with_query("dates", &date.replace('-', ""));
                }
                (http_request, "/events")
            }
            DataType::Odds => {
                return Err(SourceError::unsupported(
                    PROVIDER,
                    request.sport,
                    request.data_type,
                ))
            }
        };
        Ok(planned)
    }
}

/// Rosters for some sports group athletes by unit (`{position, items: [...]}`).
fn flatten_roster(records: Vec<Value>) -> Vec<Value> {
    records
        .into_iter()
        .flat_map(|record| match record.get("items") {
            Some(Value::Array(items)) => items.clone(),
            _ => vec![record],
        })
        .collect()
}

fn competitor_side(competitor: &Value) -> GameSide {
    GameSide {
        team: team_ref(
            str_at(competitor, "/team/id"),
            str_at(competitor, "/team/displayName"),
            str_at(competitor, "/team/abbreviation"),
        ),
        score: u32_at(competitor, "/score"),
    }
}

impl ProviderAdapter for EspnAdapter {
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
            let records = records_at(&body, pointer, PROVIDER)?;
            Ok(if request.data_type == DataType::Players {
                flatten_roster(records)
            } else {
                records
            })
        })
    }

    fn normalize_team(&self, raw: &Value, sport: Sport) -> Result<CanonicalTeam, NormalizationError> {
        let team = raw.get("team").unwrap_or(raw);

        let id = str_at(team, "/id").ok_or_else(|| NormalizationError::missing(PROVIDER, "id"))?;
        let name = str_at(team, "/displayName")
            .map(|name| expand_team_alias(&name))
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "displayName"))?;
        let city = str_at(team, "/location").unwrap_or_else(|| derive_city(&name));
        let abbreviation =
            resolve_abbreviation(str_at(team, "/abbreviation").as_deref(), &name, &city)
                .ok_or_else(|| {
                    NormalizationError::new(PROVIDER, "abbreviation", "cannot derive from name")
                })?;

        Ok(CanonicalTeam {
            id,
            name,
            city,
            abbreviation,
            conference: str_at(team, "/groups/parent/name"),
            division: str_at(team, "/groups/name"),
            league: String::from(sport.default_league()),
            sport,
            logo_url: str_at(team, "/logos/0/href"),
            founded: None,
            record: str_at(team, "/record/items/0/summary").and_then(|summary| parse_record(&summary)),
            source: PROVIDER,
            last_updated: UtcDateTime::now(),
        })
    }

    fn normalize_player(
        &self,
        raw: &Value,
        sport: Sport,
    ) -> Result<CanonicalPlayer, NormalizationError> {
        let id = str_at(raw, "/id").ok_or_else(|| NormalizationError::missing(PROVIDER, "id"))?;
        let (full_name, first_name, last_name) = player_names(
            str_at(raw, "/fullName").or_else(|| str_at(raw, "/displayName")),
            str_at(raw, "/firstName"),
            str_at(raw, "/lastName"),
        )
        .ok_or_else(|| NormalizationError::missing(PROVIDER, "fullName"))?;

        Ok(CanonicalPlayer {
            id,
            full_name,
            first_name,
            last_name,
            position: str_at(raw, "/position/abbreviation"),
            jersey_number: str_at(raw, "/jersey"),
            team: team_ref(
                str_at(raw, "/team/id"),
                str_at(raw, "/team/displayName"),
                str_at(raw, "/team/abbreviation"),
            ),
            physical: PhysicalAttributes {
                height: str_at(raw, "/displayHeight"),
                weight: str_at(raw, "/displayWeight"),
                age: u32_at(raw, "/age"),
            },
            active: bool_at(raw, "/active").unwrap_or(true),
            sport,
            source: PROVIDER,
            last_updated: UtcDateTime::now(),
        })
    }

    fn normalize_game(&self, raw: &Value, sport: Sport) -> Result<CanonicalGame, NormalizationError> {
        let id = str_at(raw, "/id").ok_or_else(|| NormalizationError::missing(PROVIDER, "id"))?;
        let date_text =
            str_at(raw, "/date").ok_or_else(|| NormalizationError::missing(PROVIDER, "date"))?;
        let (date, start_time) = parse_date(&date_text).ok_or_else(|| {
            NormalizationError::new(PROVIDER, "date", format!("unrecognized date '{date_text}'"))
        })?;

        let competitors = match raw.pointer("/competitions/0/competitors") {
            Some(Value::Array(competitors)) => competitors.as_slice(),
            _ => return Err(NormalizationError::missing(PROVIDER, "competitions.competitors")),
        };
        let side = |home_away: &str| {
            competitors
                .iter()
                .find(|competitor| competitor.get("homeAway").and_then(Value::as_str) == Some(home_away))
                .map(competitor_side)
        };
        let home = side("home").ok_or_else(|| NormalizationError::missing(PROVIDER, "home competitor"))?;
        let away = side("away").ok_or_else(|| NormalizationError::missing(PROVIDER, "away competitor"))?;

        let status = str_at(raw, "/status/type/description")
            .or_else(|| str_at(raw, "/status/type/name"))
            .map_or(crate::GameStatus::Scheduled, |text| parse_status(&text));
        let game_type = match u32_at(raw, "/season/type") {
            Some(1) => GameType::Preseason,
            Some(2) => GameType::Regular,
            Some(3) => GameType::Postseason,
            Some(_) => GameType::Other,
            None => str_at(raw, "/season/slug").map_or(GameType::Regular, |slug| parse_game_type(&slug)),
        };
        let broadcasts = match raw.pointer("/competitions/0/broadcasts") {
            Some(Value::Array(groups)) => groups
                .iter()
                .filter_map(|group| group.get("names").and_then(Value::as_array))
                .flatten()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            _ => Vec::new(),
        };

        Ok(CanonicalGame::new(id, date, status, home, away, sport, PROVIDER)
            .with_start_time(start_time)
            .with_season(str_at(raw, "/season/year"))
            .with_game_type(game_type)
            .with_venue(str_at(raw, "/competitions/0/venue/fullName"))
            .with_broadcasts(broadcasts))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::date;

    use super::*;
    use crate::http_client::StaticHttpClient;
    use crate::GameStatus;

    fn adapter(client: StaticHttpClient) -> EspnAdapter {
        EspnAdapter::new(Arc::new(client))
    }

    fn scoreboard_event(status: &str) -> Value {
        json!({
            "id": "401585601",
            "date": "2024-01-15T00:30Z",
            "season": {"year": 2024, "type": 2},
            "status": {"type": {"name": status}},
            "competitions": [{
                "venue": {"fullName": "Crypto.com Arena"},
                "broadcasts": [{"names": ["TNT"]}, {"names": ["ESPN+"]}],
                "competitors": [
                    {"homeAway": "home", "score": "112",
                     "team": {"id": "13", "displayName": "Los Angeles Lakers", "abbreviation": "LAL"}},
                    {"homeAway": "away", "score": "105",
                     "team": {"id": "2", "displayName": "Boston Celtics", "abbreviation": "BOS"}}
                ]
            }]
        })
    }

    #[tokio::test]
    async fn games_request_formats_date_filter_and_reads_events() {
        let client = Arc::new(StaticHttpClient::new().with_json(
            "basketball/nba/scoreboard",
            json!({"events": [scoreboard_event("STATUS_FINAL")]}).to_string(),
        ));
        let espn = EspnAdapter::new(client.clone());
        let request = DataRequest::new(DataType::Games, Sport::Basketball).with_filter("date", "2024-01-15");

        let records = espn.fetch(&request).await.expect("fetch succeeds");
        assert_eq!(records.len(), 1);
        assert!(client.requests()[0].url.ends_with("/scoreboard?dates=20240115"));
    }

    #[tokio::test]
    async fn player_lookup_without_team_filter_is_rejected() {
        let espn = adapter(StaticHttpClient::new());
        let request = DataRequest::new(DataType::Players, Sport::Basketball);

        let error = espn.fetch(&request).await.expect_err("team filter required");
        assert_eq!(error.kind(), crate::provider::SourceErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn grouped_rosters_are_flattened() {
        let client = StaticHttpClient::new().with_json(
            "teams/12/roster",
            json!({"athletes": [
                {"position": "offense", "items": [{"id": "1", "fullName": "Patrick Mahomes"}]},
                {"position": "defense", "items": [{"id": "2", "fullName": "Chris Jones"}]}
            ]})
            .to_string(),
        );
        let request = DataRequest::new(DataType::Players, Sport::Football).with_filter("team", "12");

        let records = adapter(client).fetch(&request).await.expect("fetch succeeds");
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn normalizes_wrapped_team() {
        let raw = json!({"team": {
            "id": "13",
            "location": "Los Angeles",
            "displayName": "Los Angeles Lakers",
            "abbreviation": "lal",
            "logos": [{"href": "https://a.espncdn.com/lal.png"}],
            "record": {"items": [{"summary": "30-10"}]}
        }});

        let team = adapter(StaticHttpClient::new())
            .normalize_team(&raw, Sport::Basketball)
            .expect("team normalizes");
        assert_eq!(team.city, "Los Angeles");
        assert_eq!(team.abbreviation.as_str(), "LAL");
        assert_eq!(team.league, "NBA");
        assert_eq!(team.record.map(|record| record.wins), Some(30));
    }

    #[test]
    fn normalizes_scoreboard_event() {
        let game = adapter(StaticHttpClient::new())
            .normalize_game(&scoreboard_event("STATUS_FINAL"), Sport::Basketball)
            .expect("game normalizes");

        assert_eq!(game.date, date!(2024 - 01 - 15));
        assert_eq!(game.status, GameStatus::Finished);
        assert_eq!(game.home.score, Some(112));
        assert_eq!(game.away.team.abbreviation.map(|a| a.as_str().to_owned()).as_deref(), Some("BOS"));
        assert_eq!(game.season.as_deref(), Some("2024"));
        assert_eq!(game.broadcasts, vec![String::from("TNT"), String::from("ESPN+")]);
    }

    #[test]
    fn scheduled_event_carries_no_scores() {
        let mut raw = scoreboard_event("STATUS_SCHEDULED");
        raw["status"]["type"]["description"] = json!("Scheduled");

        let game = adapter(StaticHttpClient::new())
            .normalize_game(&raw, Sport::Basketball)
            .expect("game normalizes");
        assert_eq!(game.status, GameStatus::Scheduled);
        assert_eq!((game.home.score, game.away.score), (None, None));
    }

    #[test]
    fn event_without_competitors_is_rejected() {
        let raw = json!({"id": "1", "date": "2024-01-15"});
        let error = adapter(StaticHttpClient::new())
            .normalize_game(&raw, Sport::Basketball)
            .expect_err("competitors required");
        assert_eq!(error.field, "competitions.competitors");
    }
}
