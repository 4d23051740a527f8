//! Entity reconciler: converges one transport record with its stored
//! row.
//!
//! Reconciliation is idempotent. A row is inserted on first sighting
//! of a remote identifier and updated in place afterwards; when no
//! mapped field differs the row and its `updated_at` are left
//! untouched. Foreign references are resolved immediately before the
//! write; an unresolved reference is recoverable - the relationship is
//! left unset and a warning is attached to the record outcome.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::client::records::{
    GameRecord, PlayerRecord, SeasonStatLine, TeamRecord, TeamStatRecord,
};
use crate::error::Result;
use crate::store::rows::{GameRow, PlayerRow, PlayerSeasonRow, TeamRow, TeamSeasonRow};
use crate::store::Store;

/// What reconciling one record did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAction {
    Inserted,
    Updated,
    Unchanged,
}

/// Per-record reconciliation outcome
#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub action: RecordAction,
    /// Local row id of the reconciled entity
    pub row_id: i64,
    pub warnings: Vec<String>,
}

impl RecordOutcome {
    fn new(action: RecordAction, row_id: i64) -> Self {
        Self {
            action,
            row_id,
            warnings: Vec::new(),
        }
    }

    fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

// ── Teams ───────────────────────────────────────────────────────

pub async fn reconcile_team(
    store: &Store,
    rec: &TeamRecord,
    now: DateTime<Utc>,
) -> Result<RecordOutcome> {
    match store.find_team_by_nhl_id(rec.nhl_id).await? {
        None => {
            let id = store.insert_team(rec, now).await?;
            debug!("Inserted team {} ({})", rec.abbreviation, rec.nhl_id);
            Ok(RecordOutcome::new(RecordAction::Inserted, id))
        }
        Some(existing) => {
            if team_changed(&existing, rec) {
                store.update_team(existing.id, rec, now).await?;
                debug!("Updated team {} ({})", rec.abbreviation, rec.nhl_id);
                Ok(RecordOutcome::new(RecordAction::Updated, existing.id))
            } else {
                Ok(RecordOutcome::new(RecordAction::Unchanged, existing.id))
            }
        }
    }
}

fn team_changed(row: &TeamRow, rec: &TeamRecord) -> bool {
    row.name != rec.name
        || row.abbreviation != rec.abbreviation
        || row.city != rec.city
        || row.conference != rec.conference
        || row.division != rec.division
        || row.active != rec.active
}

// ── Players ─────────────────────────────────────────────────────

pub async fn reconcile_player(
    store: &Store,
    rec: &PlayerRecord,
    now: DateTime<Utc>,
) -> Result<RecordOutcome> {
    let mut warnings = Vec::new();

    // Resolve the team reference just before the write. A named but
    // locally unknown team leaves the relationship unset.
    let resolved_team = match &rec.team_abbrev {
        Some(abbrev) => {
            let team = store.find_team_by_abbrev(abbrev).await?;
            if team.is_none() {
                warnings.push(format!(
                    "team {abbrev} not known locally; player {} left unassigned",
                    rec.nhl_id
                ));
            }
            team.map(|t| t.id)
        }
        None => None,
    };

    match store.find_player_by_nhl_id(rec.nhl_id).await? {
        None => {
            let id = store.insert_player(rec, resolved_team, now).await?;
            debug!("Inserted player {} {} ({})", rec.first_name, rec.last_name, rec.nhl_id);
            Ok(RecordOutcome::new(RecordAction::Inserted, id).with_warnings(warnings))
        }
        Some(existing) => {
            // An unresolved reference keeps the stored relationship;
            // an absent one means the player has no current team.
            let team_id = if rec.team_abbrev.is_some() && resolved_team.is_none() {
                existing.team_id
            } else {
                resolved_team
            };

            if player_changed(&existing, rec, team_id) {
                store.update_player(existing.id, rec, team_id, now).await?;
                debug!("Updated player {} {} ({})", rec.first_name, rec.last_name, rec.nhl_id);
                Ok(RecordOutcome::new(RecordAction::Updated, existing.id).with_warnings(warnings))
            } else {
                Ok(RecordOutcome::new(RecordAction::Unchanged, existing.id).with_warnings(warnings))
            }
        }
    }
}

fn player_changed(row: &PlayerRow, rec: &PlayerRecord, team_id: Option<i64>) -> bool {
    row.first_name != rec.first_name
        || row.last_name != rec.last_name
        || row.jersey_number != rec.jersey_number
        || row.position != rec.position
        || row.shoots_catches != rec.shoots_catches
        || row.height_inches != rec.height_inches
        || row.weight_pounds != rec.weight_pounds
        || row.birth_date != rec.birth_date
        || row.birth_city != rec.birth_city
        || row.birth_country != rec.birth_country
        || row.nationality != rec.nationality
        || row.team_id != team_id
        || row.active != rec.active
}

// ── Games ───────────────────────────────────────────────────────

pub async fn reconcile_game(
    store: &Store,
    rec: &GameRecord,
    now: DateTime<Utc>,
) -> Result<RecordOutcome> {
    let mut warnings = Vec::new();

    let home = resolve_game_team(
        store,
        rec.home_team_nhl_id,
        rec.home_team_abbrev.as_deref(),
        rec.nhl_id,
        "home",
        &mut warnings,
    )
    .await?;
    let away = resolve_game_team(
        store,
        rec.away_team_nhl_id,
        rec.away_team_abbrev.as_deref(),
        rec.nhl_id,
        "away",
        &mut warnings,
    )
    .await?;

    match store.find_game_by_nhl_id(rec.nhl_id).await? {
        None => {
            let id = store.insert_game(rec, home, away, now).await?;
            debug!("Inserted game {}", rec.nhl_id);
            Ok(RecordOutcome::new(RecordAction::Inserted, id).with_warnings(warnings))
        }
        Some(existing) => {
            let home = home.or(existing.home_team_id);
            let away = away.or(existing.away_team_id);

            if game_changed(&existing, rec, home, away) {
                store.update_game(existing.id, rec, home, away, now).await?;
                debug!("Updated game {}", rec.nhl_id);
                Ok(RecordOutcome::new(RecordAction::Updated, existing.id).with_warnings(warnings))
            } else {
                Ok(RecordOutcome::new(RecordAction::Unchanged, existing.id).with_warnings(warnings))
            }
        }
    }
}

async fn resolve_game_team(
    store: &Store,
    nhl_id: Option<i64>,
    abbrev: Option<&str>,
    game_id: i64,
    side: &str,
    warnings: &mut Vec<String>,
) -> Result<Option<i64>> {
    if let Some(id) = nhl_id {
        if let Some(team) = store.find_team_by_nhl_id(id).await? {
            return Ok(Some(team.id));
        }
    }
    if let Some(abbrev) = abbrev {
        if let Some(team) = store.find_team_by_abbrev(abbrev).await? {
            return Ok(Some(team.id));
        }
    }
    if nhl_id.is_some() || abbrev.is_some() {
        warnings.push(format!(
            "{side} team {} of game {game_id} not known locally; reference left unset",
            abbrev.map(str::to_string).unwrap_or_else(|| {
                nhl_id.map(|id| id.to_string()).unwrap_or_default()
            })
        ));
    }
    Ok(None)
}

fn game_changed(
    row: &GameRow,
    rec: &GameRecord,
    home_team_id: Option<i64>,
    away_team_id: Option<i64>,
) -> bool {
    row.season != rec.season
        || row.game_type != rec.game_type
        || row.game_date != rec.game_date
        || row.home_team_id != home_team_id
        || row.away_team_id != away_team_id
        || row.home_score != rec.home_score
        || row.away_score != rec.away_score
        || row.game_state != rec.game_state.as_str()
        || row.venue != rec.venue
}

// ── Player season stats ─────────────────────────────────────────

pub async fn reconcile_player_season(
    store: &Store,
    player_id: i64,
    line: &SeasonStatLine,
    now: DateTime<Utc>,
) -> Result<RecordOutcome> {
    let mut warnings = Vec::new();

    let resolved_team = match &line.team_name {
        Some(name) => {
            let team = store.find_team_by_name(name).await?;
            if team.is_none() {
                warnings.push(format!(
                    "team '{name}' not known locally; season {} stats left unassigned",
                    line.season
                ));
            }
            team.map(|t| t.id)
        }
        None => None,
    };

    match store.find_player_season(player_id, &line.season).await? {
        None => {
            let id = store
                .insert_player_season(player_id, line, resolved_team, now)
                .await?;
            Ok(RecordOutcome::new(RecordAction::Inserted, id).with_warnings(warnings))
        }
        Some(existing) => {
            let team_id = if line.team_name.is_some() && resolved_team.is_none() {
                existing.team_id
            } else {
                resolved_team
            };

            if player_season_changed(&existing, line, team_id) {
                store
                    .update_player_season(existing.id, line, team_id, now)
                    .await?;
                Ok(RecordOutcome::new(RecordAction::Updated, existing.id).with_warnings(warnings))
            } else {
                Ok(RecordOutcome::new(RecordAction::Unchanged, existing.id).with_warnings(warnings))
            }
        }
    }
}

fn player_season_changed(
    row: &PlayerSeasonRow,
    line: &SeasonStatLine,
    team_id: Option<i64>,
) -> bool {
    row.team_id != team_id
        || row.games_played != line.games_played
        || row.goals != line.goals
        || row.assists != line.assists
        || row.points != line.points
        || row.plus_minus != line.plus_minus
        || row.penalty_minutes != line.penalty_minutes
        || row.power_play_goals != line.power_play_goals
        || row.shorthanded_goals != line.shorthanded_goals
        || row.game_winning_goals != line.game_winning_goals
        || row.shots != line.shots
        || row.shooting_pctg != line.shooting_pctg
        || row.wins != line.wins
        || row.losses != line.losses
        || row.overtime_losses != line.overtime_losses
        || row.shutouts != line.shutouts
        || row.goals_against_avg != line.goals_against_avg
        || row.save_pctg != line.save_pctg
}

// ── Team season stats ───────────────────────────────────────────

pub async fn reconcile_team_season(
    store: &Store,
    team_id: i64,
    rec: &TeamStatRecord,
    now: DateTime<Utc>,
) -> Result<RecordOutcome> {
    match store.find_team_season(team_id, &rec.season).await? {
        None => {
            let id = store.insert_team_season(team_id, rec, now).await?;
            Ok(RecordOutcome::new(RecordAction::Inserted, id))
        }
        Some(existing) => {
            if team_season_changed(&existing, rec) {
                store.update_team_season(existing.id, rec, now).await?;
                Ok(RecordOutcome::new(RecordAction::Updated, existing.id))
            } else {
                Ok(RecordOutcome::new(RecordAction::Unchanged, existing.id))
            }
        }
    }
}

fn team_season_changed(row: &TeamSeasonRow, rec: &TeamStatRecord) -> bool {
    row.games_played != rec.games_played
        || row.wins != rec.wins
        || row.losses != rec.losses
        || row.overtime_losses != rec.overtime_losses
        || row.points != rec.points
        || row.point_pctg != rec.point_pctg
        || row.goals_for != rec.goals_for
        || row.goals_against != rec.goals_against
        || row.goal_differential != rec.goal_differential
}
