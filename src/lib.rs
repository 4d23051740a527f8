pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod sync;

pub use client::{NhlClient, StatsApi};
pub use config::AppConfig;
pub use error::{Result, SyncError};
pub use store::Store;
pub use sync::{
    CancelToken, FetchKind, OpStatus, OperationOutcome, RecordAction, RecordOutcome, SyncEngine,
};
