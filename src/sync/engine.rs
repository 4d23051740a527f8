//! Fetch orchestrator: drives one named fetch operation end-to-end
//! and produces a single outcome summary.
//!
//! Per-record processing is independent: a failure reconciling one
//! record is caught and folded into the operation outcome, never
//! thrown past the operation boundary. Only a failure of the whole
//! batch fetch short-circuits an operation.

use chrono::{NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use super::audit::{self, FetchKind, OpStatus, OperationOutcome};
use super::reconciler::{self, RecordOutcome};
use crate::client::StatsApi;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::store::Store;

/// Abort signal checked at each record boundary. Cancelling never
/// rolls back records already committed.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Running per-operation accounting
#[derive(Default)]
struct Tally {
    succeeded: u32,
    failed: u32,
    warnings: u32,
    first_error: Option<String>,
    batch_error: Option<String>,
    cancelled: bool,
}

impl Tally {
    fn batch_failure(error: impl std::fmt::Display) -> Self {
        Self {
            batch_error: Some(error.to_string()),
            ..Default::default()
        }
    }

    fn record_success(&mut self, outcome: &RecordOutcome) {
        self.succeeded += 1;
        self.warnings += outcome.warnings.len() as u32;
        for warning in &outcome.warnings {
            warn!("{warning}");
        }
    }

    fn record_failure(&mut self, message: String) {
        self.failed += 1;
        if self.first_error.is_none() {
            self.first_error = Some(message);
        }
    }

    /// Fold a composed sub-operation into this tally. A sub-operation
    /// that failed wholesale (no record accounting) counts as one
    /// failure.
    fn merge_operation(&mut self, outcome: &OperationOutcome) {
        if outcome.status == OpStatus::Error && outcome.succeeded == 0 && outcome.failed == 0 {
            self.failed += 1;
        } else {
            self.failed += outcome.failed;
        }
        self.succeeded += outcome.succeeded;
        self.warnings += outcome.warnings;
        if self.first_error.is_none() {
            self.first_error = outcome.error_message.clone();
        }
    }

    fn status(&self) -> OpStatus {
        if self.batch_error.is_some() {
            OpStatus::Error
        } else if self.cancelled && self.succeeded == 0 {
            OpStatus::Error
        } else if self.cancelled || (self.failed > 0 && self.succeeded > 0) {
            OpStatus::Partial
        } else if self.failed > 0 {
            OpStatus::Error
        } else {
            OpStatus::Success
        }
    }

    fn error_message(&self) -> Option<String> {
        if let Some(error) = &self.batch_error {
            return Some(error.clone());
        }

        let mut parts = Vec::new();
        if self.cancelled {
            parts.push("operation cancelled".to_string());
        }
        if self.failed > 0 {
            match &self.first_error {
                Some(first) => {
                    parts.push(format!("{} record(s) failed; first: {first}", self.failed))
                }
                None => parts.push(format!("{} record(s) failed", self.failed)),
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

/// Fetch orchestrator
pub struct SyncEngine {
    client: Arc<dyn StatsApi>,
    store: Store,
    worker_permits: usize,
    cancel: CancelToken,
}

impl SyncEngine {
    pub fn new(client: Arc<dyn StatsApi>, store: Store, config: &SyncConfig) -> Self {
        Self {
            client,
            store,
            worker_permits: config.worker_permits.max(1),
            cancel: CancelToken::new(),
        }
    }

    /// Handle for aborting in-progress operations between records
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn season_or_current(&self, season: Option<&str>) -> String {
        season
            .map(str::to_string)
            .unwrap_or_else(|| self.client.current_season())
    }

    /// Seal an operation: one audit row, one summary line.
    async fn finish(&self, kind: FetchKind, started: Instant, tally: Tally) -> OperationOutcome {
        let outcome = OperationOutcome {
            kind,
            status: tally.status(),
            succeeded: tally.succeeded,
            failed: tally.failed,
            warnings: tally.warnings,
            error_message: tally.error_message(),
            duration: started.elapsed(),
        };

        audit::record_outcome(&self.store, &outcome).await;

        match outcome.status {
            OpStatus::Success => info!("{}", outcome.summary()),
            _ => warn!("{}", outcome.summary()),
        }
        outcome
    }

    /// Fetch all teams from the remote standings and reconcile each.
    pub async fn fetch_teams(&self) -> OperationOutcome {
        let started = Instant::now();
        info!("Starting team fetch");

        let records = match self.client.fetch_teams().await {
            Ok(records) => records,
            Err(e) => {
                return self
                    .finish(FetchKind::Teams, started, Tally::batch_failure(e))
                    .await
            }
        };

        let mut tally = Tally::default();
        for record in records {
            if self.cancel.is_cancelled() {
                tally.cancelled = true;
                break;
            }
            match record {
                Ok(team) => {
                    match reconciler::reconcile_team(&self.store, &team, Utc::now()).await {
                        Ok(outcome) => tally.record_success(&outcome),
                        Err(e) => {
                            warn!("Failed to reconcile team {}: {}", team.abbreviation, e);
                            tally.record_failure(e.to_string());
                        }
                    }
                }
                Err(e) => {
                    warn!("Skipping malformed team record: {e}");
                    tally.record_failure(e.to_string());
                }
            }
        }

        self.finish(FetchKind::Teams, started, tally).await
    }

    /// Fetch a team's roster and reconcile each player through the
    /// worker pool.
    pub async fn fetch_roster(&self, team_abbrev: &str, season: Option<&str>) -> OperationOutcome {
        let started = Instant::now();
        let season = self.season_or_current(season);
        info!("Starting roster fetch for {team_abbrev} ({season})");

        match self.store.find_team_by_abbrev(team_abbrev).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                let error = SyncError::UnknownTeam(team_abbrev.to_string());
                return self
                    .finish(FetchKind::Roster, started, Tally::batch_failure(error))
                    .await;
            }
            Err(e) => {
                return self
                    .finish(FetchKind::Roster, started, Tally::batch_failure(e))
                    .await
            }
        }

        let records = match self.client.fetch_roster(team_abbrev, &season).await {
            Ok(records) => records,
            Err(e) => {
                return self
                    .finish(FetchKind::Roster, started, Tally::batch_failure(e))
                    .await
            }
        };

        let mut tally = Tally::default();
        let semaphore = Arc::new(Semaphore::new(self.worker_permits));
        let mut tasks: JoinSet<(String, Result<RecordOutcome>)> = JoinSet::new();

        for record in records {
            if self.cancel.is_cancelled() {
                tally.cancelled = true;
                break;
            }
            match record {
                Ok(player) => {
                    let permit = match semaphore.clone().acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    };
                    let store = self.store.clone();
                    tasks.spawn(async move {
                        let _permit = permit;
                        let label = format!("{} {}", player.first_name, player.last_name);
                        let result =
                            reconciler::reconcile_player(&store, &player, Utc::now()).await;
                        (label, result)
                    });
                }
                Err(e) => {
                    warn!("Skipping malformed roster record for {team_abbrev}: {e}");
                    tally.record_failure(e.to_string());
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => tally.record_success(&outcome),
                Ok((label, Err(e))) => {
                    warn!("Failed to reconcile player {label}: {e}");
                    tally.record_failure(e.to_string());
                }
                Err(e) => tally.record_failure(format!("reconcile task failed: {e}")),
            }
        }

        self.finish(FetchKind::Roster, started, tally).await
    }

    /// Fetch a team's season counters from the standings and
    /// reconcile the single season-stat row.
    pub async fn fetch_team_stats(
        &self,
        team_abbrev: &str,
        season: Option<&str>,
    ) -> OperationOutcome {
        let started = Instant::now();
        let season = self.season_or_current(season);
        info!("Starting team stats fetch for {team_abbrev} ({season})");

        let team = match self.store.find_team_by_abbrev(team_abbrev).await {
            Ok(Some(team)) => team,
            Ok(None) => {
                let error = SyncError::UnknownTeam(team_abbrev.to_string());
                return self
                    .finish(FetchKind::TeamStats, started, Tally::batch_failure(error))
                    .await;
            }
            Err(e) => {
                return self
                    .finish(FetchKind::TeamStats, started, Tally::batch_failure(e))
                    .await
            }
        };

        let record = match self.client.fetch_team_stats(team_abbrev, &season).await {
            Ok(record) => record,
            Err(e) => {
                return self
                    .finish(FetchKind::TeamStats, started, Tally::batch_failure(e))
                    .await
            }
        };

        let mut tally = Tally::default();
        match reconciler::reconcile_team_season(&self.store, team.id, &record, Utc::now()).await {
            Ok(outcome) => tally.record_success(&outcome),
            Err(e) => {
                warn!("Failed to reconcile team stats for {team_abbrev}: {e}");
                tally.record_failure(e.to_string());
            }
        }

        self.finish(FetchKind::TeamStats, started, tally).await
    }

    /// Fetch landing pages for every stored player of a team and
    /// reconcile each player plus their season stat rows as one
    /// record group.
    pub async fn fetch_player_stats(&self, team_abbrev: &str) -> OperationOutcome {
        let started = Instant::now();
        info!("Starting player stats fetch for {team_abbrev}");

        let team = match self.store.find_team_by_abbrev(team_abbrev).await {
            Ok(Some(team)) => team,
            Ok(None) => {
                let error = SyncError::UnknownTeam(team_abbrev.to_string());
                return self
                    .finish(FetchKind::PlayerStats, started, Tally::batch_failure(error))
                    .await;
            }
            Err(e) => {
                return self
                    .finish(FetchKind::PlayerStats, started, Tally::batch_failure(e))
                    .await
            }
        };

        let players = match self.store.players_for_team(team.id).await {
            Ok(players) => players,
            Err(e) => {
                return self
                    .finish(FetchKind::PlayerStats, started, Tally::batch_failure(e))
                    .await
            }
        };

        let mut tally = Tally::default();
        let semaphore = Arc::new(Semaphore::new(self.worker_permits));
        let mut tasks: JoinSet<(String, Result<RecordOutcome>)> = JoinSet::new();

        for player in players {
            if self.cancel.is_cancelled() {
                tally.cancelled = true;
                break;
            }
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let store = self.store.clone();
            let client = Arc::clone(&self.client);
            tasks.spawn(async move {
                let _permit = permit;
                let label = format!("{} {}", player.first_name, player.last_name);
                let result = reconcile_player_group(client.as_ref(), &store, player.nhl_id).await;
                (label, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => tally.record_success(&outcome),
                Ok((label, Err(e))) => {
                    warn!("Failed to reconcile stats for {label}: {e}");
                    tally.record_failure(e.to_string());
                }
                Err(e) => tally.record_failure(format!("reconcile task failed: {e}")),
            }
        }

        self.finish(FetchKind::PlayerStats, started, tally).await
    }

    /// Fetch the schedule week containing `date` (today when absent)
    /// and reconcile each game.
    pub async fn fetch_schedule(&self, date: Option<NaiveDate>) -> OperationOutcome {
        let started = Instant::now();
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        info!("Starting schedule fetch for week of {date}");

        let records = match self.client.fetch_schedule(date).await {
            Ok(records) => records,
            Err(e) => {
                return self
                    .finish(FetchKind::Schedule, started, Tally::batch_failure(e))
                    .await
            }
        };

        let mut tally = Tally::default();
        for record in records {
            if self.cancel.is_cancelled() {
                tally.cancelled = true;
                break;
            }
            match record {
                Ok(game) => {
                    match reconciler::reconcile_game(&self.store, &game, Utc::now()).await {
                        Ok(outcome) => tally.record_success(&outcome),
                        Err(e) => {
                            warn!("Failed to reconcile game {}: {}", game.nhl_id, e);
                            tally.record_failure(e.to_string());
                        }
                    }
                }
                Err(e) => {
                    warn!("Skipping malformed game record: {e}");
                    tally.record_failure(e.to_string());
                }
            }
        }

        self.finish(FetchKind::Schedule, started, tally).await
    }

    /// Full sync: all teams, then roster and season stats per active
    /// team in the order the remote returned them. Composed
    /// operations append their own audit rows; one aggregate row is
    /// appended for the whole run.
    pub async fn fetch_all(&self, season: Option<&str>) -> OperationOutcome {
        let started = Instant::now();
        let season = self.season_or_current(season);
        info!("Starting full sync for season {season}");

        let mut tally = Tally::default();

        let teams_outcome = self.fetch_teams().await;
        if teams_outcome.status == OpStatus::Error {
            // Without the team list nothing downstream can resolve.
            tally.batch_error = Some(
                teams_outcome
                    .error_message
                    .unwrap_or_else(|| "team fetch failed".to_string()),
            );
            return self.finish(FetchKind::Full, started, tally).await;
        }
        tally.merge_operation(&teams_outcome);

        let teams = match self.store.active_teams().await {
            Ok(teams) => teams,
            Err(e) => {
                return self
                    .finish(FetchKind::Full, started, Tally::batch_failure(e))
                    .await
            }
        };

        for team in &teams {
            if self.cancel.is_cancelled() {
                tally.cancelled = true;
                break;
            }
            let roster = self.fetch_roster(&team.abbreviation, Some(&season)).await;
            tally.merge_operation(&roster);

            let stats = self
                .fetch_team_stats(&team.abbreviation, Some(&season))
                .await;
            tally.merge_operation(&stats);
        }

        self.finish(FetchKind::Full, started, tally).await
    }
}

/// One logical record group: the player row plus its season rows.
async fn reconcile_player_group(
    client: &dyn StatsApi,
    store: &Store,
    player_nhl_id: i64,
) -> Result<RecordOutcome> {
    let landing = client.fetch_player_landing(player_nhl_id).await?;
    let mut outcome = reconciler::reconcile_player(store, &landing.player, Utc::now()).await?;

    for line in &landing.seasons {
        let line_outcome =
            reconciler::reconcile_player_season(store, outcome.row_id, line, Utc::now()).await?;
        outcome.warnings.extend(line_outcome.warnings);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::reconciler::RecordAction;
    use std::time::Duration;

    fn outcome(action: RecordAction) -> RecordOutcome {
        RecordOutcome {
            action,
            row_id: 1,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn tally_status_transitions() {
        let mut tally = Tally::default();
        assert_eq!(tally.status(), OpStatus::Success);

        tally.record_success(&outcome(RecordAction::Inserted));
        assert_eq!(tally.status(), OpStatus::Success);

        tally.record_failure("boom".to_string());
        assert_eq!(tally.status(), OpStatus::Partial);

        let mut all_failed = Tally::default();
        all_failed.record_failure("boom".to_string());
        assert_eq!(all_failed.status(), OpStatus::Error);

        assert_eq!(
            Tally::batch_failure("remote down").status(),
            OpStatus::Error
        );
    }

    #[test]
    fn cancelled_tally_is_partial_or_error() {
        let mut some_done = Tally::default();
        some_done.record_success(&outcome(RecordAction::Updated));
        some_done.cancelled = true;
        assert_eq!(some_done.status(), OpStatus::Partial);
        assert!(some_done
            .error_message()
            .unwrap()
            .contains("operation cancelled"));

        let nothing_done = Tally {
            cancelled: true,
            ..Default::default()
        };
        assert_eq!(nothing_done.status(), OpStatus::Error);
    }

    #[test]
    fn error_message_counts_failures() {
        let mut tally = Tally::default();
        tally.record_success(&outcome(RecordAction::Inserted));
        tally.record_failure("missing field 'firstName'".to_string());
        tally.record_failure("another".to_string());

        let message = tally.error_message().unwrap();
        assert!(message.contains("2 record(s) failed"));
        assert!(message.contains("missing field 'firstName'"));
    }

    #[test]
    fn merging_wholesale_failure_counts_one() {
        let failed_op = OperationOutcome {
            kind: FetchKind::Roster,
            status: OpStatus::Error,
            succeeded: 0,
            failed: 0,
            warnings: 0,
            error_message: Some("Unknown team: XXX".to_string()),
            duration: Duration::from_millis(5),
        };

        let mut tally = Tally::default();
        tally.merge_operation(&failed_op);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.status(), OpStatus::Error);
    }
}
