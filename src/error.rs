use thiserror::Error;

/// Main error type for the stats tracker
#[derive(Error, Debug)]
pub enum SyncError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transient fetch failure: {0}")]
    Transient(String),

    #[error("Remote resource not found: {0}")]
    NotFound(String),

    // Payload errors
    #[error("Malformed record: missing field '{field}'{}", fmt_remote_id(.remote_id))]
    MalformedRecord {
        field: String,
        remote_id: Option<i64>,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Lookup errors
    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

fn fmt_remote_id(remote_id: &Option<i64>) -> String {
    match remote_id {
        Some(id) => format!(" (remote id {id})"),
        None => String::new(),
    }
}

impl SyncError {
    /// Whether a failed remote call may succeed on retry.
    ///
    /// Network-level failures and 5xx/429 responses are transient;
    /// 404s and malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Transient(_) => true,
            SyncError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

/// Result type alias for SyncError
pub type Result<T> = std::result::Result<T, SyncError>;

/// Per-record result used by batch endpoints: one entry per remote
/// record, so a single bad record does not poison the whole batch.
pub type RecordResult<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(SyncError::Transient("503 from remote".into()).is_transient());
        assert!(!SyncError::NotFound("player 99".into()).is_transient());
        assert!(!SyncError::MalformedRecord {
            field: "firstName".into(),
            remote_id: Some(8478402),
        }
        .is_transient());
    }

    #[test]
    fn malformed_record_names_field_and_id() {
        let err = SyncError::MalformedRecord {
            field: "abbreviation".into(),
            remote_id: Some(10),
        };
        let msg = err.to_string();
        assert!(msg.contains("abbreviation"));
        assert!(msg.contains("10"));
    }
}
