pub mod config;
pub mod history;

pub use config::{ConfigError, SubmissionConfig, ENDPOINT_URL_PREFIX};
pub use history::{HistoryEntry, HistoryStats, PayloadKind, ScanOutcome};
