//! Remote client for the NHL web API.
//!
//! Purely read/parse: issues HTTP requests, validates payloads into
//! transport records, never touches local state. Transient failures
//! (network errors, 5xx, rate limiting) are retried with bounded
//! exponential backoff per HTTP call; 404s and malformed payloads
//! fail immediately.

pub mod records;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RemoteConfig;
use crate::error::{RecordResult, Result, SyncError};
use records::{
    GameRecord, GameState, PlayerLanding, PlayerRecord, SeasonStatLine, TeamRecord, TeamStatRecord,
};

/// Remote API seam. The sync engine is written against this trait so
/// tests can drive it with a scripted fake.
#[async_trait]
pub trait StatsApi: Send + Sync {
    /// Season identifier to use when the caller does not name one
    fn current_season(&self) -> String;

    async fn fetch_teams(&self) -> Result<Vec<RecordResult<TeamRecord>>>;

    async fn fetch_roster(
        &self,
        team_abbrev: &str,
        season: &str,
    ) -> Result<Vec<RecordResult<PlayerRecord>>>;

    async fn fetch_team_stats(&self, team_abbrev: &str, season: &str) -> Result<TeamStatRecord>;

    async fn fetch_player_landing(&self, player_id: i64) -> Result<PlayerLanding>;

    async fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<RecordResult<GameRecord>>>;
}

/// Season identifier for a calendar date. NHL seasons roll over in
/// October: 2023-10-15 and 2024-02-15 both fall in "20232024".
pub fn season_for_date(date: NaiveDate) -> String {
    if date.month() >= 10 {
        format!("{}{}", date.year(), date.year() + 1)
    } else {
        format!("{}{}", date.year() - 1, date.year())
    }
}

// ── Raw payload structs ─────────────────────────────────────────

/// Localized name field. The remote API usually sends
/// `{"default": "..."}` but some payload versions send a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Localized {
    Named { default: String },
    Plain(String),
}

impl Localized {
    fn get(&self) -> &str {
        match self {
            Self::Named { default } => default,
            Self::Plain(s) => s,
        }
    }
}

fn localized(value: &Option<Localized>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.get().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Deserialize)]
struct StandingsResponse {
    #[serde(default)]
    standings: Vec<StandingRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StandingRow {
    team_abbrev: Option<Localized>,
    team_name: Option<Localized>,
    team_common_name: Option<Localized>,
    place_name: Option<Localized>,
    conference_name: Option<String>,
    division_name: Option<String>,
    team_logo: Option<String>,
    #[serde(default)]
    games_played: i32,
    #[serde(default)]
    wins: i32,
    #[serde(default)]
    losses: i32,
    #[serde(default)]
    ot_losses: i32,
    #[serde(default)]
    points: i32,
    point_pctg: Option<f64>,
    #[serde(default)]
    goal_for: i32,
    #[serde(default)]
    goal_against: i32,
    #[serde(default)]
    goal_differential: i32,
}

#[derive(Debug, Deserialize)]
struct RosterResponse {
    #[serde(default)]
    forwards: Vec<RawRosterPlayer>,
    #[serde(default)]
    defensemen: Vec<RawRosterPlayer>,
    #[serde(default)]
    goalies: Vec<RawRosterPlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRosterPlayer {
    id: Option<i64>,
    first_name: Option<Localized>,
    last_name: Option<Localized>,
    sweater_number: Option<i32>,
    position_code: Option<String>,
    shoots_catches: Option<String>,
    height_in_inches: Option<i32>,
    weight_in_pounds: Option<i32>,
    birth_date: Option<String>,
    birth_city: Option<Localized>,
    birth_country: Option<String>,
    nationality: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayerLanding {
    player_id: Option<i64>,
    first_name: Option<Localized>,
    last_name: Option<Localized>,
    sweater_number: Option<i32>,
    position: Option<String>,
    shoots_catches: Option<String>,
    height_in_inches: Option<i32>,
    weight_in_pounds: Option<i32>,
    birth_date: Option<String>,
    birth_city: Option<Localized>,
    birth_country: Option<String>,
    nationality: Option<String>,
    current_team_abbrev: Option<String>,
    is_active: Option<bool>,
    #[serde(default)]
    season_totals: Vec<RawSeasonTotal>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSeasonTotal {
    season: Option<i64>,
    league_abbrev: Option<String>,
    game_type_id: Option<i32>,
    team_name: Option<Localized>,
    games_played: Option<i32>,
    goals: Option<i32>,
    assists: Option<i32>,
    points: Option<i32>,
    plus_minus: Option<i32>,
    pim: Option<i32>,
    power_play_goals: Option<i32>,
    shorthanded_goals: Option<i32>,
    game_winning_goals: Option<i32>,
    shots: Option<i32>,
    shooting_pctg: Option<f64>,
    wins: Option<i32>,
    losses: Option<i32>,
    ot_losses: Option<i32>,
    shutouts: Option<i32>,
    goals_against_avg: Option<f64>,
    save_pctg: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleResponse {
    #[serde(default)]
    game_week: Vec<ScheduleDay>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDay {
    #[serde(default)]
    games: Vec<RawGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGame {
    id: Option<i64>,
    season: Option<i64>,
    game_type: Option<i32>,
    #[serde(rename = "startTimeUTC")]
    start_time_utc: Option<String>,
    game_state: Option<String>,
    venue: Option<Localized>,
    home_team: Option<RawGameTeam>,
    away_team: Option<RawGameTeam>,
}

#[derive(Debug, Deserialize)]
struct RawGameTeam {
    id: Option<i64>,
    abbrev: Option<String>,
    score: Option<i32>,
}

// ── Client ──────────────────────────────────────────────────────

/// Client for the NHL web API
pub struct NhlClient {
    http: reqwest::Client,
    config: RemoteConfig,
}

impl NhlClient {
    pub fn new(config: RemoteConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent("pucksync/0.1")
            .build()
            .expect("failed to build reqwest client");
        Self { http, config }
    }

    /// GET a JSON payload with bounded exponential retry on transient
    /// failures. Backoff is applied per HTTP call, the smallest
    /// retryable unit.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let mut attempt = 0u32;

        loop {
            match self.try_get(&url).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.backoff_duration(attempt);
                    attempt += 1;
                    warn!(
                        "Transient failure for {} (attempt {}/{}): {}; retrying in {:?}",
                        url, attempt, self.config.max_retries, e, delay
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SyncError::NotFound(url.to_string()));
        }
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SyncError::Transient(format!("{status} from {url}")));
        }
        if !status.is_success() {
            return match resp.error_for_status() {
                Err(e) => Err(SyncError::Http(e)),
                Ok(_) => Err(SyncError::Transient(format!("{status} from {url}"))),
            };
        }

        // A decode failure here is a malformed payload, not retried.
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl StatsApi for NhlClient {
    fn current_season(&self) -> String {
        season_for_date(Utc::now().date_naive())
    }

    async fn fetch_teams(&self) -> Result<Vec<RecordResult<TeamRecord>>> {
        let data: StandingsResponse = self.get_json("standings/now").await?;

        let mut teams = Vec::with_capacity(data.standings.len());
        let mut seen = std::collections::HashSet::new();
        for row in &data.standings {
            let record = validate_team(row);
            if let Ok(team) = &record {
                // Standings repeat clubs across groupings; keep the first sighting.
                if !seen.insert(team.abbreviation.clone()) {
                    continue;
                }
            }
            teams.push(record);
        }

        debug!("Fetched {} team records from standings", teams.len());
        Ok(teams)
    }

    async fn fetch_roster(
        &self,
        team_abbrev: &str,
        season: &str,
    ) -> Result<Vec<RecordResult<PlayerRecord>>> {
        let data: RosterResponse = self
            .get_json(&format!("roster/{team_abbrev}/{season}"))
            .await?;

        let players: Vec<RecordResult<PlayerRecord>> = data
            .forwards
            .iter()
            .chain(data.defensemen.iter())
            .chain(data.goalies.iter())
            .map(|raw| validate_roster_player(raw, team_abbrev))
            .collect();

        debug!(
            "Fetched {} roster records for {} ({})",
            players.len(),
            team_abbrev,
            season
        );
        Ok(players)
    }

    async fn fetch_team_stats(&self, team_abbrev: &str, season: &str) -> Result<TeamStatRecord> {
        let data: StandingsResponse = self.get_json(&format!("standings/{season}")).await?;

        let row = data
            .standings
            .iter()
            .find(|row| {
                localized(&row.team_abbrev).as_deref() == Some(team_abbrev)
            })
            .ok_or_else(|| {
                SyncError::NotFound(format!("team {team_abbrev} in standings for {season}"))
            })?;

        Ok(TeamStatRecord {
            team_abbrev: team_abbrev.to_string(),
            season: season.to_string(),
            games_played: row.games_played,
            wins: row.wins,
            losses: row.losses,
            overtime_losses: row.ot_losses,
            points: row.points,
            point_pctg: row.point_pctg,
            goals_for: row.goal_for,
            goals_against: row.goal_against,
            goal_differential: row.goal_differential,
        })
    }

    async fn fetch_player_landing(&self, player_id: i64) -> Result<PlayerLanding> {
        let data: RawPlayerLanding = self
            .get_json(&format!("player/{player_id}/landing"))
            .await?;
        validate_player_landing(&data, player_id)
    }

    async fn fetch_schedule(&self, date: NaiveDate) -> Result<Vec<RecordResult<GameRecord>>> {
        let data: ScheduleResponse = self
            .get_json(&format!("schedule/{}", date.format("%Y-%m-%d")))
            .await?;

        let games: Vec<RecordResult<GameRecord>> = data
            .game_week
            .iter()
            .flat_map(|day| day.games.iter())
            .map(validate_game)
            .collect();

        debug!("Fetched {} game records for week of {}", games.len(), date);
        Ok(games)
    }
}

// ── Validation ──────────────────────────────────────────────────

fn missing(field: &str, remote_id: Option<i64>) -> SyncError {
    SyncError::MalformedRecord {
        field: field.to_string(),
        remote_id,
    }
}

/// Remote identifier for a team. Standings rows carry no numeric id;
/// recover it from the logo asset path, falling back to a stable
/// value derived from the abbreviation.
fn team_remote_id(row: &StandingRow, abbrev: &str) -> i64 {
    row.team_logo
        .as_deref()
        .and_then(team_id_from_logo)
        .unwrap_or_else(|| derived_team_id(abbrev))
}

fn team_id_from_logo(logo: &str) -> Option<i64> {
    let file = logo.rsplit('/').next()?;
    let digits: String = file.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

fn derived_team_id(abbrev: &str) -> i64 {
    abbrev.bytes().fold(0i64, |acc, b| acc * 31 + i64::from(b))
}

fn validate_team(row: &StandingRow) -> RecordResult<TeamRecord> {
    let abbrev = localized(&row.team_abbrev).ok_or_else(|| missing("teamAbbrev", None))?;

    let city = localized(&row.place_name);
    let name = localized(&row.team_name)
        .or_else(|| match (&city, localized(&row.team_common_name)) {
            (Some(city), Some(common)) => Some(format!("{city} {common}")),
            _ => None,
        })
        .ok_or_else(|| missing("teamName", None))?;

    Ok(TeamRecord {
        nhl_id: team_remote_id(row, &abbrev),
        name,
        abbreviation: abbrev,
        city,
        conference: row.conference_name.clone(),
        division: row.division_name.clone(),
        active: true,
    })
}

fn validate_roster_player(raw: &RawRosterPlayer, team_abbrev: &str) -> RecordResult<PlayerRecord> {
    let nhl_id = raw.id.ok_or_else(|| missing("id", None))?;
    let first_name = localized(&raw.first_name).ok_or_else(|| missing("firstName", Some(nhl_id)))?;
    let last_name = localized(&raw.last_name).ok_or_else(|| missing("lastName", Some(nhl_id)))?;

    Ok(PlayerRecord {
        nhl_id,
        first_name,
        last_name,
        jersey_number: raw.sweater_number,
        position: raw.position_code.clone(),
        shoots_catches: raw.shoots_catches.clone(),
        height_inches: raw.height_in_inches,
        weight_pounds: raw.weight_in_pounds,
        birth_date: parse_birth_date(raw.birth_date.as_deref()),
        birth_city: localized(&raw.birth_city),
        birth_country: raw.birth_country.clone(),
        nationality: raw.nationality.clone(),
        team_abbrev: Some(team_abbrev.to_string()),
        active: true,
    })
}

fn validate_player_landing(raw: &RawPlayerLanding, requested_id: i64) -> Result<PlayerLanding> {
    let nhl_id = raw.player_id.unwrap_or(requested_id);
    let first_name = localized(&raw.first_name).ok_or_else(|| missing("firstName", Some(nhl_id)))?;
    let last_name = localized(&raw.last_name).ok_or_else(|| missing("lastName", Some(nhl_id)))?;

    let player = PlayerRecord {
        nhl_id,
        first_name,
        last_name,
        jersey_number: raw.sweater_number,
        position: raw.position.clone(),
        shoots_catches: raw.shoots_catches.clone(),
        height_inches: raw.height_in_inches,
        weight_pounds: raw.weight_in_pounds,
        birth_date: parse_birth_date(raw.birth_date.as_deref()),
        birth_city: localized(&raw.birth_city),
        birth_country: raw.birth_country.clone(),
        nationality: raw.nationality.clone(),
        team_abbrev: raw.current_team_abbrev.clone(),
        active: raw.is_active.unwrap_or(true),
    };

    // NHL regular-season lines only; other leagues and game types are
    // out of scope for the season tables.
    let seasons = raw
        .season_totals
        .iter()
        .filter(|line| {
            line.league_abbrev.as_deref() == Some("NHL") && line.game_type_id == Some(2)
        })
        .filter_map(|line| {
            let season = match line.season {
                Some(s) => s.to_string(),
                None => {
                    debug!("Dropping season line without season id for player {nhl_id}");
                    return None;
                }
            };
            Some(SeasonStatLine {
                season,
                team_name: localized(&line.team_name),
                games_played: line.games_played,
                goals: line.goals,
                assists: line.assists,
                points: line.points,
                plus_minus: line.plus_minus,
                penalty_minutes: line.pim,
                power_play_goals: line.power_play_goals,
                shorthanded_goals: line.shorthanded_goals,
                game_winning_goals: line.game_winning_goals,
                shots: line.shots,
                shooting_pctg: line.shooting_pctg,
                wins: line.wins,
                losses: line.losses,
                overtime_losses: line.ot_losses,
                shutouts: line.shutouts,
                goals_against_avg: line.goals_against_avg,
                save_pctg: line.save_pctg,
            })
        })
        .collect();

    Ok(PlayerLanding { player, seasons })
}

fn validate_game(raw: &RawGame) -> RecordResult<GameRecord> {
    let nhl_id = raw.id.ok_or_else(|| missing("id", None))?;
    let season = raw
        .season
        .map(|s| s.to_string())
        .ok_or_else(|| missing("season", Some(nhl_id)))?;
    let game_date = raw
        .start_time_utc
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| missing("startTimeUTC", Some(nhl_id)))?;

    let game_type = raw.game_type.map(|t| match t {
        1 => "PRE".to_string(),
        2 => "REG".to_string(),
        3 => "PLAYOFF".to_string(),
        other => other.to_string(),
    });

    let state = raw
        .game_state
        .as_deref()
        .map(GameState::from_remote)
        .unwrap_or(GameState::Scheduled);

    Ok(GameRecord {
        nhl_id,
        season,
        game_type,
        game_date,
        home_team_nhl_id: raw.home_team.as_ref().and_then(|t| t.id),
        home_team_abbrev: raw.home_team.as_ref().and_then(|t| t.abbrev.clone()),
        away_team_nhl_id: raw.away_team.as_ref().and_then(|t| t.id),
        away_team_abbrev: raw.away_team.as_ref().and_then(|t| t.abbrev.clone()),
        home_score: raw.home_team.as_ref().and_then(|t| t.score),
        away_score: raw.away_team.as_ref().and_then(|t| t.score),
        game_state: state,
        venue: localized(&raw.venue),
    })
}

fn parse_birth_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}
