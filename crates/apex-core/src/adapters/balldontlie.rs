use std::sync::Arc;

use serde_json::Value;

use super::normalize::{
    derive_city, expand_team_alias, parse_date, parse_status, player_names, resolve_abbreviation,
    str_at, team_ref, u32_at,
};
use super::{execute_json, records_at};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::provider::{FetchFuture, ProviderAdapter, SourceError};
use crate::{
    CanonicalGame, CanonicalPlayer, CanonicalTeam, DataRequest, DataType, GameSide, GameType,
    NormalizationError, PhysicalAttributes, ProviderId, Sport, TeamRef, UtcDateTime,
};

const DEFAULT_BASE_URL: &str = "https://api.balldontlie.io/v1";
const PROVIDER: ProviderId = ProviderId::BallDontLie;

/// balldontlie NBA API. Basketball only; key sent in the `Authorization` header.
#[derive(Clone)]
pub struct BallDontLieAdapter {
    http_client: Arc<dyn HttpClient>,
    api_key: String,
    base_url: String,
    timeout_ms: u64,
}

impl BallDontLieAdapter {
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

    fn build_request(&self, request: &DataRequest) -> Result<HttpRequest, SourceError> {
        if !self.supports(request.sport, request.data_type) {
            return Err(SourceError::unsupported(
                PROVIDER,
                request.sport,
                request.data_type,
            ));
        }

        let mut http_request =
            HttpRequest::get(format!("{}/{}", self.base_url, request.data_type.as_str()));
        let filters = [
            ("team", "team_ids[]"),
            ("date", "dates[]"),
            ("season", "seasons[]"),
            ("search", "search"),
        ];
        for (filter, parameter) in filters {
            // Team listings ignore every filter but search.
            if request.data_type == DataType::Teams && filter != "search" {
                continue;
            }
            if let Some(value) = request.filter(filter) {
                http_request = http_request.with_query(parameter, value);
            }
        }

        Ok(http_request
            .with_query("per_page", "100")
            .with_auth(&HttpAuth::Header {
                name: String::from("authorization"),
                value: self.api_key.clone(),
            })
            .with_timeout_ms(self.timeout_ms))
    }
}

fn nested_team(raw: &Value, pointer: &str) -> TeamRef {
    let Some(team) = raw.pointer(pointer) else {
        return TeamRef::default();
    };
    team_ref(
        str_at(team, "/id"),
        str_at(team, "/full_name"),
        str_at(team, "/abbreviation"),
    )
}

impl ProviderAdapter for BallDontLieAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn supports(&self, sport: Sport, data_type: DataType) -> bool {
        sport == Sport::Basketball && data_type != DataType::Odds
    }

    fn fetch<'a>(&'a self, request: &'a DataRequest) -> FetchFuture<'a> {
        Box::pin(async move {
            let http_request = self.build_request(request)?;
            let body = execute_json(self.http_client.as_ref(), PROVIDER, http_request).await?;
            records_at(&body, "/data", PROVIDER)
        })
    }

    fn normalize_team(&self, raw: &Value, sport: Sport) -> Result<CanonicalTeam, NormalizationError> {
        let id = str_at(raw, "/id").ok_or_else(|| NormalizationError::missing(PROVIDER, "id"))?;
        let name = str_at(raw, "/full_name")
            .map(|name| expand_team_alias(&name))
            .ok_or_else(|| NormalizationError::missing(PROVIDER, "full_name"))?;
        let city = str_at(raw, "/city").unwrap_or_else(|| derive_city(&name));
        let abbreviation =
            resolve_abbreviation(str_at(raw, "/abbreviation").as_deref(), &name, &city)
                .ok_or_else(|| {
                    NormalizationError::new(PROVIDER, "abbreviation", "cannot derive from name")
                })?;

        Ok(CanonicalTeam {
            id,
            name,
            city,
            abbreviation,
            conference: str_at(raw, "/conference"),
            division: str_at(raw, "/division"),
            league: String::from(sport.default_league()),
            sport,
            logo_url: None,
            founded: None,
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
        let id = str_at(raw, "/id").ok_or_else(|| NormalizationError::missing(PROVIDER, "id"))?;
        let (full_name, first_name, last_name) = player_names(
            None,
            str_at(raw, "/first_name"),
            str_at(raw, "/last_name"),
        )
        .ok_or_else(|| NormalizationError::missing(PROVIDER, "first_name"))?;

        Ok(CanonicalPlayer {
            id,
            full_name,
            first_name,
            last_name,
            position: str_at(raw, "/position"),
            jersey_number: str_at(raw, "/jersey_number"),
            team: nested_team(raw, "/team"),
            physical: PhysicalAttributes {
                height: str_at(raw, "/height"),
                weight: str_at(raw, "/weight"),
                age: None,
            },
            active: true,
            sport,
            source: PROVIDER,
            last_updated: UtcDateTime::now(),
        })
    }

    fn normalize_game(&self, raw: &Value, sport: Sport) -> Result<CanonicalGame, NormalizationError> {
        let id = str_at(raw, "/id").ok_or_else(|| NormalizationError::missing(PROVIDER, "id"))?;
        let date_text =
            str_at(raw, "/date").ok_or_else(|| NormalizationError::missing(PROVIDER, "date"))?;
        let (date, _) = parse_date(&date_text).ok_or_else(|| {
            NormalizationError::new(PROVIDER, "date", format!("unrecognized date '{date_text}'"))
        })?;

        // Before tip-off the status field holds the scheduled start instant.
        let status_text = str_at(raw, "/status").unwrap_or_default();
        let start_time = str_at(raw, "/datetime")
            .and_then(|text| parse_date(&text))
            .or_else(|| parse_date(&status_text))
            .and_then(|(_, instant)| instant);
        let status = parse_status(&status_text);

        let home = GameSide {
            team: nested_team(raw, "/home_team"),
            score: u32_at(raw, "/home_team_score"),
        };
        let away = GameSide {
            team: nested_team(raw, "/visitor_team"),
            score: u32_at(raw, "/visitor_team_score"),
        };
        if home.team.is_empty() || away.team.is_empty() {
            return Err(NormalizationError::missing(PROVIDER, "home_team/visitor_team"));
        }

        let game_type = match raw.get("postseason").and_then(Value::as_bool) {
            Some(true) => GameType::Postseason,
            _ => GameType::Regular,
        };

        Ok(CanonicalGame::new(id, date, status, home, away, sport, PROVIDER)
            .with_start_time(start_time)
            .with_season(str_at(raw, "/season"))
            .with_game_type(game_type))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http_client::StaticHttpClient;
    use crate::GameStatus;

    fn adapter() -> BallDontLieAdapter {
        BallDontLieAdapter::new(Arc::new(StaticHttpClient::new()), "test-key")
    }

    #[tokio::test]
    async fn sends_key_in_authorization_header_and_maps_filters() {
        let client = Arc::new(
            StaticHttpClient::new().with_json("/games", json!({"data": [], "meta": {}}).to_string()),
        );
        let adapter = BallDontLieAdapter::new(client.clone(), "secret");
        let request = DataRequest::new(DataType::Games, Sport::Basketball)
            .with_filter("date", "2024-01-15")
            .with_filter("team", "14");

        let records = adapter.fetch(&request).await.expect("fetch succeeds");
        assert!(records.is_empty());

        let requests = client.requests();
        let sent = &requests[0];
        assert_eq!(sent.headers.get("authorization").map(String::as_str), Some("secret"));
        assert!(sent.url.contains("dates%5B%5D=2024-01-15"));
        assert!(sent.url.contains("team_ids%5B%5D=14"));
    }

    #[tokio::test]
    async fn other_sports_are_unsupported() {
        let request = DataRequest::new(DataType::Teams, Sport::Hockey);
        let error = adapter().fetch(&request).await.expect_err("basketball only");
        assert_eq!(error.kind(), crate::provider::SourceErrorKind::Unsupported);
    }

    #[test]
    fn normalizes_flat_team() {
        let raw = json!({
            "id": 14,
            "abbreviation": "LAL",
            "city": "Los Angeles",
            "conference": "West",
            "division": "Pacific",
            "full_name": "Los Angeles Lakers",
            "name": "Lakers"
        });

        let team = adapter().normalize_team(&raw, Sport::Basketball).expect("team");
        assert_eq!(team.id, "14");
        assert_eq!(team.abbreviation.as_str(), "LAL");
        assert_eq!(team.conference.as_deref(), Some("West"));
    }

    #[test]
    fn joins_player_names() {
        let raw = json!({
            "id": 237,
            "first_name": "LeBron",
            "last_name": "James",
            "position": "F",
            "height": "6-9",
            "jersey_number": "23",
            "team": {"id": 14, "full_name": "Los Angeles Lakers", "abbreviation": "LAL"}
        });

        let player = adapter().normalize_player(&raw, Sport::Basketball).expect("player");
        assert_eq!(player.full_name, "LeBron James");
        assert_eq!(player.team.id.as_deref(), Some("14"));
        assert_eq!(player.physical.height.as_deref(), Some("6-9"));
    }

    #[test]
    fn scheduled_game_uses_status_as_start_time() {
        let raw = json!({
            "id": 1037593,
            "date": "2024-01-15",
            "season": 2023,
            "status": "2024-01-16T00:30:00Z",
            "postseason": false,
            "home_team": {"id": 14, "full_name": "Los Angeles Lakers", "abbreviation": "LAL"},
            "home_team_score": 0,
            "visitor_team": {"id": 2, "full_name": "Boston Celtics", "abbreviation": "BOS"},
            "visitor_team_score": 0
        });

        let game = adapter().normalize_game(&raw, Sport::Basketball).expect("game");
        assert_eq!(game.status, GameStatus::Scheduled);
        assert_eq!(game.home.score, None);
        assert_eq!(
            game.start_time.map(UtcDateTime::format_rfc3339).as_deref(),
            Some("2024-01-16T00:30:00Z")
        );
    }

    #[test]
    fn game_without_teams_is_rejected() {
        let raw = json!({"id": 1, "date": "2024-01-15", "status": "Final"});
        assert!(adapter().normalize_game(&raw, Sport::Basketball).is_err());
    }
}
