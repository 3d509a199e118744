mod abbreviation;
mod models;
mod sport;
mod timestamp;

pub use abbreviation::Abbreviation;
pub use models::{
    CanonicalGame, CanonicalOdds, CanonicalPayload, CanonicalPlayer, CanonicalTeam, GameSide,
    GameStatus, GameType, PhysicalAttributes, TeamRecord, TeamRef,
};
pub use sport::{DataType, Sport};
pub use timestamp::UtcDateTime;
