//! Transport records: validated representations of remote API items.
//!
//! Every optional field is genuinely optional in the remote payload.
//! Validation (required-field checks) happens at the client boundary;
//! downstream code can rely on the shapes here.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One team as listed by the remote standings endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRecord {
    /// Immutable remote identifier, the reconciliation key
    pub nhl_id: i64,
    pub name: String,
    pub abbreviation: String,
    pub city: Option<String>,
    pub conference: Option<String>,
    pub division: Option<String>,
    pub active: bool,
}

/// One player as listed by the roster endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub nhl_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub jersey_number: Option<i32>,
    pub position: Option<String>,
    pub shoots_catches: Option<String>,
    pub height_inches: Option<i32>,
    pub weight_pounds: Option<i32>,
    pub birth_date: Option<NaiveDate>,
    pub birth_city: Option<String>,
    pub birth_country: Option<String>,
    pub nationality: Option<String>,
    /// Abbreviation of the team whose roster produced this record
    pub team_abbrev: Option<String>,
    pub active: bool,
}

/// Team season counters as reported by the standings payload.
///
/// Percentage-valued rates come from the remote source verbatim and
/// are never recomputed locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamStatRecord {
    pub team_abbrev: String,
    pub season: String,
    pub games_played: i32,
    pub wins: i32,
    pub losses: i32,
    pub overtime_losses: i32,
    pub points: i32,
    pub point_pctg: Option<f64>,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_differential: i32,
}

/// Player detail plus per-season stat rows from the landing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLanding {
    pub player: PlayerRecord,
    /// NHL regular-season lines only
    pub seasons: Vec<SeasonStatLine>,
}

/// One season of counters for a player. Skater fields and goalie
/// fields are both optional; a row populates whichever group applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonStatLine {
    /// Season identifier, e.g. "20232024"
    pub season: String,
    /// Full team name as given by the remote source, when present
    pub team_name: Option<String>,
    pub games_played: Option<i32>,

    // Skater counters
    pub goals: Option<i32>,
    pub assists: Option<i32>,
    pub points: Option<i32>,
    pub plus_minus: Option<i32>,
    pub penalty_minutes: Option<i32>,
    pub power_play_goals: Option<i32>,
    pub shorthanded_goals: Option<i32>,
    pub game_winning_goals: Option<i32>,
    pub shots: Option<i32>,
    pub shooting_pctg: Option<f64>,

    // Goalie counters
    pub wins: Option<i32>,
    pub losses: Option<i32>,
    pub overtime_losses: Option<i32>,
    pub shutouts: Option<i32>,
    pub goals_against_avg: Option<f64>,
    pub save_pctg: Option<f64>,
}

/// Game state as tracked locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    Scheduled,
    Live,
    Final,
}

impl GameState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "SCHEDULED",
            Self::Live => "LIVE",
            Self::Final => "FINAL",
        }
    }

    /// Map the remote `gameState` value. Unknown values read as
    /// scheduled; the next sync corrects them once the state settles.
    pub fn from_remote(raw: &str) -> Self {
        match raw {
            "LIVE" | "CRIT" => Self::Live,
            "FINAL" | "OFF" => Self::Final,
            _ => Self::Scheduled,
        }
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One scheduled or played game from the schedule endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub nhl_id: i64,
    pub season: String,
    pub game_type: Option<String>,
    pub game_date: DateTime<Utc>,
    pub home_team_nhl_id: Option<i64>,
    pub home_team_abbrev: Option<String>,
    pub away_team_nhl_id: Option<i64>,
    pub away_team_abbrev: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub game_state: GameState,
    pub venue: Option<String>,
}
