use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Abbreviation, DataType, ProviderId, Sport, UtcDateTime};

mod game_date {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::macros::format_description;
    use time::Date;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let value = date
            .format(format_description!("[year]-[month]-[day]"))
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Date::parse(&value, format_description!("[year]-[month]-[day]")).map_err(D::Error::custom)
    }
}

/// Win/loss record. `win_pct` is derived when the provider omits it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub win_pct: f64,
}

impl TeamRecord {
    pub fn new(wins: u32, losses: u32, ties: u32, provided_pct: Option<f64>) -> Self {
        let played = u64::from(wins) + u64::from(losses) + u64::from(ties);
        let win_pct = match provided_pct {
            Some(pct) if pct.is_finite() => pct,
            _ if played == 0 => 0.0,
            _ => f64::from(wins) / played as f64,
        };
        Self {
            wins,
            losses,
            ties,
            win_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTeam {
    pub id: String,
    pub name: String,
    pub city: String,
    pub abbreviation: Abbreviation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    pub league: String,
    pub sport: Sport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub founded: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<TeamRecord>,
    pub source: ProviderId,
    pub last_updated: UtcDateTime,
}

/// Loose reference to a team as reported alongside another record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abbreviation: Option<Abbreviation>,
}

impl TeamRef {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.abbreviation.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPlayer {
    pub id: String,
    pub full_name: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jersey_number: Option<String>,
    pub team: TeamRef,
    pub physical: PhysicalAttributes,
    pub active: bool,
    pub sport: Sport,
    pub source: ProviderId,
    pub last_updated: UtcDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Scheduled,
    Live,
    Finished,
    Postponed,
    Cancelled,
}

impl GameStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Finished => "finished",
            Self::Postponed => "postponed",
            Self::Cancelled => "cancelled",
        }
    }

    const fn stage(self) -> u8 {
        match self {
            Self::Scheduled => 0,
            Self::Live => 1,
            Self::Finished | Self::Postponed | Self::Cancelled => 2,
        }
    }

    pub const fn is_terminal(self) -> bool {
        self.stage() == 2
    }

    /// Whether `next` may follow `self`. Repeating a status is always legal;
    /// terminal statuses accept no successor.
    pub fn can_transition_to(self, next: Self) -> bool {
        self == next || (!self.is_terminal() && next.stage() > self.stage())
    }
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameType {
    Preseason,
    #[default]
    Regular,
    Postseason,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSide {
    pub team: TeamRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalGame {
    pub id: String,
    #[serde(with = "game_date")]
    pub date: Date,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<UtcDateTime>,
    pub status: GameStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    pub game_type: GameType,
    pub home: GameSide,
    pub away: GameSide,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default)]
    pub broadcasts: Vec<String>,
    pub sport: Sport,
    pub source: ProviderId,
    pub last_updated: UtcDateTime,
}

impl CanonicalGame {
    /// Builds a game, dropping scores while the game is still scheduled.
    pub fn new(
        id: impl Into<String>,
        date: Date,
        status: GameStatus,
        home: GameSide,
        away: GameSide,
        sport: Sport,
        source: ProviderId,
    ) -> Self {
        let mut game = Self {
            id: id.into(),
            date,
            start_time: None,
            status,
            season: None,
            game_type: GameType::Regular,
            home,
            away,
            venue: None,
            broadcasts: Vec::new(),
            sport,
            source,
            last_updated: UtcDateTime::now(),
        };
        game.strip_scores_if_scheduled();
        game
    }

    pub fn with_start_time(mut self, start_time: Option<UtcDateTime>) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_season(mut self, season: Option<String>) -> Self {
        self.season = season;
        self
    }

    pub fn with_game_type(mut self, game_type: GameType) -> Self {
        self.game_type = game_type;
        self
    }

    pub fn with_venue(mut self, venue: Option<String>) -> Self {
        self.venue = venue;
        self
    }

    pub fn with_broadcasts(mut self, broadcasts: Vec<String>) -> Self {
        self.broadcasts = broadcasts;
        self
    }

    /// Replaces the status, keeping the no-scores-while-scheduled rule.
    pub fn set_status(&mut self, status: GameStatus) {
        self.status = status;
        self.strip_scores_if_scheduled();
    }

    fn strip_scores_if_scheduled(&mut self) {
        if self.status == GameStatus::Scheduled {
            self.home.score = None;
            self.away.score = None;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalOdds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    pub home_team: String,
    pub away_team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_moneyline: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_moneyline: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    pub bookmaker: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commence_time: Option<UtcDateTime>,
    pub sport: Sport,
    pub source: ProviderId,
    pub last_updated: UtcDateTime,
}

/// Normalized records of one data type. This is the cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "records", rename_all = "snake_case")]
pub enum CanonicalPayload {
    Teams(Vec<CanonicalTeam>),
    Players(Vec<CanonicalPlayer>),
    Games(Vec<CanonicalGame>),
    Odds(Vec<CanonicalOdds>),
}

impl CanonicalPayload {
    pub fn empty(data_type: DataType) -> Self {
        match data_type {
            DataType::Teams => Self::Teams(Vec::new()),
            DataType::Players => Self::Players(Vec::new()),
            DataType::Games => Self::Games(Vec::new()),
            DataType::Odds => Self::Odds(Vec::new()),
        }
    }

    pub const fn data_type(&self) -> DataType {
        match self {
            Self::Teams(_) => DataType::Teams,
            Self::Players(_) => DataType::Players,
            Self::Games(_) => DataType::Games,
            Self::Odds(_) => DataType::Odds,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Teams(records) => records.len(),
            Self::Players(records) => records.len(),
            Self::Games(records) => records.len(),
            Self::Odds(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn side(score: Option<u32>) -> GameSide {
        GameSide {
            team: TeamRef::default(),
            score,
        }
    }

    #[test]
    fn record_derives_win_pct() {
        let record = TeamRecord::new(30, 10, 0, None);
        assert!((record.win_pct - 0.75).abs() < f64::EPSILON);
        assert_eq!(TeamRecord::new(0, 0, 0, None).win_pct, 0.0);
        assert_eq!(TeamRecord::new(1, 1, 0, Some(0.6)).win_pct, 0.6);
    }

    #[test]
    fn scheduled_games_carry_no_scores() {
        let game = CanonicalGame::new(
            "g1",
            date!(2024 - 01 - 15),
            GameStatus::Scheduled,
            side(Some(10)),
            side(Some(12)),
            Sport::Basketball,
            ProviderId::Espn,
        );
        assert_eq!(game.home.score, None);
        assert_eq!(game.away.score, None);

        let mut live = CanonicalGame::new(
            "g2",
            date!(2024 - 01 - 15),
            GameStatus::Live,
            side(Some(10)),
            side(Some(12)),
            Sport::Basketball,
            ProviderId::Espn,
        );
        assert_eq!(live.home.score, Some(10));
        live.set_status(GameStatus::Scheduled);
        assert_eq!(live.home.score, None);
    }

    #[test]
    fn status_transitions_only_move_forward() {
        assert!(GameStatus::Scheduled.can_transition_to(GameStatus::Live));
        assert!(GameStatus::Live.can_transition_to(GameStatus::Finished));
        assert!(GameStatus::Scheduled.can_transition_to(GameStatus::Postponed));
        assert!(GameStatus::Live.can_transition_to(GameStatus::Cancelled));
        assert!(GameStatus::Live.can_transition_to(GameStatus::Live));
        assert!(!GameStatus::Live.can_transition_to(GameStatus::Scheduled));
        assert!(!GameStatus::Finished.can_transition_to(GameStatus::Live));
        assert!(!GameStatus::Postponed.can_transition_to(GameStatus::Finished));
    }

    #[test]
    fn payload_serializes_with_type_tag() {
        let payload = CanonicalPayload::empty(DataType::Odds);
        let json = serde_json::to_value(&payload).expect("serializes");
        assert_eq!(json["type"], "odds");
        assert!(json["records"].as_array().expect("array").is_empty());
    }

    #[test]
    fn game_date_serializes_as_iso_day() {
        let game = CanonicalGame::new(
            "g1",
            date!(2024 - 03 - 09),
            GameStatus::Finished,
            side(Some(99)),
            side(Some(101)),
            Sport::Basketball,
            ProviderId::BallDontLie,
        );
        let json = serde_json::to_value(&game).expect("serializes");
        assert_eq!(json["date"], "2024-03-09");

        let back: CanonicalGame = serde_json::from_value(json).expect("deserializes");
        assert_eq!(back, game);
    }
}
