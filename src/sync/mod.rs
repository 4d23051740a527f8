//! Synchronization engine: per-record reconciliation, fetch
//! orchestration and the append-only audit log.

pub mod audit;
pub mod engine;
pub mod reconciler;

pub use audit::{FetchKind, OpStatus, OperationOutcome};
pub use engine::{CancelToken, SyncEngine};
pub use reconciler::{RecordAction, RecordOutcome};
