//! Audit log: one append-only row per orchestrated fetch operation.
//!
//! The audit trail is best-effort relative to the data itself: a
//! failed append is logged and swallowed, never rolling back records
//! already reconciled in the operation.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::error;

use crate::store::Store;

/// Kind of orchestrated fetch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchKind {
    Teams,
    Roster,
    TeamStats,
    PlayerStats,
    Schedule,
    Full,
}

impl FetchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Teams => "teams",
            Self::Roster => "roster",
            Self::TeamStats => "team_stats",
            Self::PlayerStats => "player_stats",
            Self::Schedule => "schedule",
            Self::Full => "full",
        }
    }
}

impl std::fmt::Display for FetchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate status of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    Success,
    Partial,
    Error,
}

impl OpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for OpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate result of one orchestrated fetch operation
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub kind: FetchKind,
    pub status: OpStatus,
    pub succeeded: u32,
    pub failed: u32,
    pub warnings: u32,
    pub error_message: Option<String>,
    pub duration: Duration,
}

impl OperationOutcome {
    /// One-line human summary, printed once per operation
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{}: {} ({} records, {} failed, {:.2}s)",
            self.kind,
            self.status,
            self.succeeded,
            self.failed,
            self.duration.as_secs_f64()
        );
        if let Some(err) = &self.error_message {
            line.push_str(&format!(" - {err}"));
        }
        line
    }
}

/// Append the audit row for a finished operation. Best-effort: a
/// write failure is reported to the log sink only.
pub async fn record_outcome(store: &Store, outcome: &OperationOutcome) {
    let result = store
        .append_fetch_log(
            outcome.kind.as_str(),
            outcome.status.as_str(),
            outcome.succeeded as i32,
            outcome.error_message.as_deref(),
            outcome.duration.as_millis() as i64,
        )
        .await;

    if let Err(e) = result {
        error!("Failed to append fetch log for {}: {}", outcome.kind, e);
    }
}
