//! Persistence gateway over SQLite.
//!
//! Holds the only write access to the store. Every write is scoped to
//! a single row, so a crash mid-batch leaves already-reconciled
//! records durably committed. Lookups are by remote identifier (or
//! composite key for season stats) plus the abbreviation lookups the
//! CLI needs.

pub mod rows;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::client::records::{GameRecord, PlayerRecord, SeasonStatLine, TeamRecord, TeamStatRecord};
use crate::config::DatabaseConfig;
use crate::error::Result;
use rows::{
    FetchLogRow, GameRow, PlayerRow, PlayerSeasonRow, StoreCounts, TeamRow, TeamSeasonRow,
};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS teams (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nhl_id INTEGER NOT NULL UNIQUE,
        name TEXT NOT NULL,
        abbreviation TEXT NOT NULL,
        city TEXT,
        conference TEXT,
        division TEXT,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_teams_abbrev ON teams(abbreviation)",
    r#"
    CREATE TABLE IF NOT EXISTS players (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nhl_id INTEGER NOT NULL UNIQUE,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        jersey_number INTEGER,
        position TEXT,
        shoots_catches TEXT,
        height_inches INTEGER,
        weight_pounds INTEGER,
        birth_date TEXT,
        birth_city TEXT,
        birth_country TEXT,
        nationality TEXT,
        team_id INTEGER REFERENCES teams(id),
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_players_name ON players(last_name, first_name)",
    r#"
    CREATE TABLE IF NOT EXISTS games (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        nhl_id INTEGER NOT NULL UNIQUE,
        season TEXT NOT NULL,
        game_type TEXT,
        game_date TEXT NOT NULL,
        home_team_id INTEGER REFERENCES teams(id),
        away_team_id INTEGER REFERENCES teams(id),
        home_score INTEGER,
        away_score INTEGER,
        game_state TEXT NOT NULL,
        venue TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_games_date ON games(game_date)",
    r#"
    CREATE TABLE IF NOT EXISTS player_season_stats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        player_id INTEGER NOT NULL REFERENCES players(id),
        season TEXT NOT NULL,
        team_id INTEGER REFERENCES teams(id),
        games_played INTEGER,
        goals INTEGER,
        assists INTEGER,
        points INTEGER,
        plus_minus INTEGER,
        penalty_minutes INTEGER,
        power_play_goals INTEGER,
        shorthanded_goals INTEGER,
        game_winning_goals INTEGER,
        shots INTEGER,
        shooting_pctg REAL,
        wins INTEGER,
        losses INTEGER,
        overtime_losses INTEGER,
        shutouts INTEGER,
        goals_against_avg REAL,
        save_pctg REAL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(player_id, season)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS team_season_stats (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        team_id INTEGER NOT NULL REFERENCES teams(id),
        season TEXT NOT NULL,
        games_played INTEGER NOT NULL DEFAULT 0,
        wins INTEGER NOT NULL DEFAULT 0,
        losses INTEGER NOT NULL DEFAULT 0,
        overtime_losses INTEGER NOT NULL DEFAULT 0,
        points INTEGER NOT NULL DEFAULT 0,
        point_pctg REAL,
        goals_for INTEGER NOT NULL DEFAULT 0,
        goals_against INTEGER NOT NULL DEFAULT 0,
        goal_differential INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(team_id, season)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS fetch_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        fetch_kind TEXT NOT NULL,
        fetch_date TEXT NOT NULL,
        status TEXT NOT NULL,
        records_fetched INTEGER NOT NULL DEFAULT 0,
        error_message TEXT,
        duration_ms INTEGER NOT NULL DEFAULT 0
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_fetch_log_date ON fetch_log(fetch_date)",
];

/// Persistence gateway
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database file
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory store for tests. A single connection keeps every
    /// query on the same memory database.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes
    pub async fn init_schema(&self) -> Result<()> {
        for ddl in SCHEMA {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        info!("Database schema initialized");
        Ok(())
    }

    // ── Teams ───────────────────────────────────────────────────

    pub async fn find_team_by_nhl_id(&self, nhl_id: i64) -> Result<Option<TeamRow>> {
        let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams WHERE nhl_id = ?")
            .bind(nhl_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_team_by_abbrev(&self, abbrev: &str) -> Result<Option<TeamRow>> {
        let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams WHERE abbreviation = ?")
            .bind(abbrev)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_team_by_name(&self, name: &str) -> Result<Option<TeamRow>> {
        let row = sqlx::query_as::<_, TeamRow>("SELECT * FROM teams WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn active_teams(&self) -> Result<Vec<TeamRow>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            "SELECT * FROM teams WHERE active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_team(&self, rec: &TeamRecord, now: DateTime<Utc>) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO teams (
                nhl_id, name, abbreviation, city, conference, division, active,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rec.nhl_id)
        .bind(&rec.name)
        .bind(&rec.abbreviation)
        .bind(&rec.city)
        .bind(&rec.conference)
        .bind(&rec.division)
        .bind(rec.active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_team(&self, id: i64, rec: &TeamRecord, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE teams
            SET name = ?, abbreviation = ?, city = ?, conference = ?, division = ?,
                active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&rec.name)
        .bind(&rec.abbreviation)
        .bind(&rec.city)
        .bind(&rec.conference)
        .bind(&rec.division)
        .bind(rec.active)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Players ─────────────────────────────────────────────────

    pub async fn find_player_by_nhl_id(&self, nhl_id: i64) -> Result<Option<PlayerRow>> {
        let row = sqlx::query_as::<_, PlayerRow>("SELECT * FROM players WHERE nhl_id = ?")
            .bind(nhl_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn players_for_team(&self, team_id: i64) -> Result<Vec<PlayerRow>> {
        let rows = sqlx::query_as::<_, PlayerRow>(
            "SELECT * FROM players WHERE team_id = ? ORDER BY last_name, first_name",
        )
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_player(
        &self,
        rec: &PlayerRecord,
        team_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO players (
                nhl_id, first_name, last_name, jersey_number, position,
                shoots_catches, height_inches, weight_pounds, birth_date,
                birth_city, birth_country, nationality, team_id, active,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rec.nhl_id)
        .bind(&rec.first_name)
        .bind(&rec.last_name)
        .bind(rec.jersey_number)
        .bind(&rec.position)
        .bind(&rec.shoots_catches)
        .bind(rec.height_inches)
        .bind(rec.weight_pounds)
        .bind(rec.birth_date)
        .bind(&rec.birth_city)
        .bind(&rec.birth_country)
        .bind(&rec.nationality)
        .bind(team_id)
        .bind(rec.active)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_player(
        &self,
        id: i64,
        rec: &PlayerRecord,
        team_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE players
            SET first_name = ?, last_name = ?, jersey_number = ?, position = ?,
                shoots_catches = ?, height_inches = ?, weight_pounds = ?,
                birth_date = ?, birth_city = ?, birth_country = ?, nationality = ?,
                team_id = ?, active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&rec.first_name)
        .bind(&rec.last_name)
        .bind(rec.jersey_number)
        .bind(&rec.position)
        .bind(&rec.shoots_catches)
        .bind(rec.height_inches)
        .bind(rec.weight_pounds)
        .bind(rec.birth_date)
        .bind(&rec.birth_city)
        .bind(&rec.birth_country)
        .bind(&rec.nationality)
        .bind(team_id)
        .bind(rec.active)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Games ───────────────────────────────────────────────────

    pub async fn find_game_by_nhl_id(&self, nhl_id: i64) -> Result<Option<GameRow>> {
        let row = sqlx::query_as::<_, GameRow>("SELECT * FROM games WHERE nhl_id = ?")
            .bind(nhl_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn insert_game(
        &self,
        rec: &GameRecord,
        home_team_id: Option<i64>,
        away_team_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO games (
                nhl_id, season, game_type, game_date, home_team_id, away_team_id,
                home_score, away_score, game_state, venue, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(rec.nhl_id)
        .bind(&rec.season)
        .bind(&rec.game_type)
        .bind(rec.game_date)
        .bind(home_team_id)
        .bind(away_team_id)
        .bind(rec.home_score)
        .bind(rec.away_score)
        .bind(rec.game_state.as_str())
        .bind(&rec.venue)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_game(
        &self,
        id: i64,
        rec: &GameRecord,
        home_team_id: Option<i64>,
        away_team_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE games
            SET season = ?, game_type = ?, game_date = ?, home_team_id = ?,
                away_team_id = ?, home_score = ?, away_score = ?, game_state = ?,
                venue = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&rec.season)
        .bind(&rec.game_type)
        .bind(rec.game_date)
        .bind(home_team_id)
        .bind(away_team_id)
        .bind(rec.home_score)
        .bind(rec.away_score)
        .bind(rec.game_state.as_str())
        .bind(&rec.venue)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Player season stats ─────────────────────────────────────

    pub async fn find_player_season(
        &self,
        player_id: i64,
        season: &str,
    ) -> Result<Option<PlayerSeasonRow>> {
        let row = sqlx::query_as::<_, PlayerSeasonRow>(
            "SELECT * FROM player_season_stats WHERE player_id = ? AND season = ?",
        )
        .bind(player_id)
        .bind(season)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn insert_player_season(
        &self,
        player_id: i64,
        line: &SeasonStatLine,
        team_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO player_season_stats (
                player_id, season, team_id, games_played,
                goals, assists, points, plus_minus, penalty_minutes,
                power_play_goals, shorthanded_goals, game_winning_goals,
                shots, shooting_pctg,
                wins, losses, overtime_losses, shutouts, goals_against_avg, save_pctg,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(player_id)
        .bind(&line.season)
        .bind(team_id)
        .bind(line.games_played)
        .bind(line.goals)
        .bind(line.assists)
        .bind(line.points)
        .bind(line.plus_minus)
        .bind(line.penalty_minutes)
        .bind(line.power_play_goals)
        .bind(line.shorthanded_goals)
        .bind(line.game_winning_goals)
        .bind(line.shots)
        .bind(line.shooting_pctg)
        .bind(line.wins)
        .bind(line.losses)
        .bind(line.overtime_losses)
        .bind(line.shutouts)
        .bind(line.goals_against_avg)
        .bind(line.save_pctg)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_player_season(
        &self,
        id: i64,
        line: &SeasonStatLine,
        team_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE player_season_stats
            SET team_id = ?, games_played = ?,
                goals = ?, assists = ?, points = ?, plus_minus = ?,
                penalty_minutes = ?, power_play_goals = ?, shorthanded_goals = ?,
                game_winning_goals = ?, shots = ?, shooting_pctg = ?,
                wins = ?, losses = ?, overtime_losses = ?, shutouts = ?,
                goals_against_avg = ?, save_pctg = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(team_id)
        .bind(line.games_played)
        .bind(line.goals)
        .bind(line.assists)
        .bind(line.points)
        .bind(line.plus_minus)
        .bind(line.penalty_minutes)
        .bind(line.power_play_goals)
        .bind(line.shorthanded_goals)
        .bind(line.game_winning_goals)
        .bind(line.shots)
        .bind(line.shooting_pctg)
        .bind(line.wins)
        .bind(line.losses)
        .bind(line.overtime_losses)
        .bind(line.shutouts)
        .bind(line.goals_against_avg)
        .bind(line.save_pctg)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Team season stats ───────────────────────────────────────

    pub async fn find_team_season(
        &self,
        team_id: i64,
        season: &str,
    ) -> Result<Option<TeamSeasonRow>> {
        let row = sqlx::query_as::<_, TeamSeasonRow>(
            "SELECT * FROM team_season_stats WHERE team_id = ? AND season = ?",
        )
        .bind(team_id)
        .bind(season)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn insert_team_season(
        &self,
        team_id: i64,
        rec: &TeamStatRecord,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO team_season_stats (
                team_id, season, games_played, wins, losses, overtime_losses,
                points, point_pctg, goals_for, goals_against, goal_differential,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(team_id)
        .bind(&rec.season)
        .bind(rec.games_played)
        .bind(rec.wins)
        .bind(rec.losses)
        .bind(rec.overtime_losses)
        .bind(rec.points)
        .bind(rec.point_pctg)
        .bind(rec.goals_for)
        .bind(rec.goals_against)
        .bind(rec.goal_differential)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    pub async fn update_team_season(
        &self,
        id: i64,
        rec: &TeamStatRecord,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE team_season_stats
            SET games_played = ?, wins = ?, losses = ?, overtime_losses = ?,
                points = ?, point_pctg = ?, goals_for = ?, goals_against = ?,
                goal_differential = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(rec.games_played)
        .bind(rec.wins)
        .bind(rec.losses)
        .bind(rec.overtime_losses)
        .bind(rec.points)
        .bind(rec.point_pctg)
        .bind(rec.goals_for)
        .bind(rec.goals_against)
        .bind(rec.goal_differential)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ── Fetch log ───────────────────────────────────────────────

    /// Append one audit row. Rows are write-once; nothing ever
    /// updates or deletes them.
    pub async fn append_fetch_log(
        &self,
        fetch_kind: &str,
        status: &str,
        records_fetched: i32,
        error_message: Option<&str>,
        duration_ms: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fetch_log (
                fetch_kind, fetch_date, status, records_fetched, error_message, duration_ms
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(fetch_kind)
        .bind(Utc::now())
        .bind(status)
        .bind(records_fetched)
        .bind(error_message)
        .bind(duration_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn recent_fetch_logs(&self, limit: i64) -> Result<Vec<FetchLogRow>> {
        let rows = sqlx::query_as::<_, FetchLogRow>(
            "SELECT * FROM fetch_log ORDER BY fetch_date DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ── Summary ─────────────────────────────────────────────────

    pub async fn counts(&self) -> Result<StoreCounts> {
        let count = |table: &str| format!("SELECT COUNT(*) FROM {table}");

        Ok(StoreCounts {
            teams: sqlx::query_scalar(&count("teams")).fetch_one(&self.pool).await?,
            players: sqlx::query_scalar(&count("players"))
                .fetch_one(&self.pool)
                .await?,
            games: sqlx::query_scalar(&count("games")).fetch_one(&self.pool).await?,
            player_seasons: sqlx::query_scalar(&count("player_season_stats"))
                .fetch_one(&self.pool)
                .await?,
            team_seasons: sqlx::query_scalar(&count("team_season_stats"))
                .fetch_one(&self.pool)
                .await?,
            fetch_logs: sqlx::query_scalar(&count("fetch_log"))
                .fetch_one(&self.pool)
                .await?,
        })
    }
}
