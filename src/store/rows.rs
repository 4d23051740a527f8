//! Persisted row types, one per table.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TeamRow {
    pub id: i64,
    pub nhl_id: i64,
    pub name: String,
    pub abbreviation: String,
    pub city: Option<String>,
    pub conference: Option<String>,
    pub division: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlayerRow {
    pub id: i64,
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
    pub team_id: Option<i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GameRow {
    pub id: i64,
    pub nhl_id: i64,
    pub season: String,
    pub game_type: Option<String>,
    pub game_date: DateTime<Utc>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub game_state: String,
    pub venue: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One season of counters for a player. Skater and goalie groups are
/// both nullable; the schema does not enforce mutual exclusivity.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlayerSeasonRow {
    pub id: i64,
    pub player_id: i64,
    pub season: String,
    pub team_id: Option<i64>,
    pub games_played: Option<i32>,

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

    pub wins: Option<i32>,
    pub losses: Option<i32>,
    pub overtime_losses: Option<i32>,
    pub shutouts: Option<i32>,
    pub goals_against_avg: Option<f64>,
    pub save_pctg: Option<f64>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TeamSeasonRow {
    pub id: i64,
    pub team_id: i64,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit row for one orchestrated fetch operation
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FetchLogRow {
    pub id: i64,
    pub fetch_kind: String,
    pub fetch_date: DateTime<Utc>,
    pub status: String,
    pub records_fetched: i32,
    pub error_message: Option<String>,
    pub duration_ms: i64,
}

/// Table counts for the `stats` command
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreCounts {
    pub teams: i64,
    pub players: i64,
    pub games: i64,
    pub player_seasons: i64,
    pub team_seasons: i64,
    pub fetch_logs: i64,
}
