use anyhow::{Context, Result};

use crate::{db::Database, models::HistoryEntry};

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const KEY_SCAN_HISTORY: &str = "scan_history";

impl Database {
    /// Oldest first. An unreadable log is reported and treated as empty so a
    /// bad write never locks the user out of scanning.
    pub async fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        let Some(raw) = self.get_value(KEY_SCAN_HISTORY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                log_warn!("Discarding unreadable scan history ({} bytes): {err}", raw.len());
                Ok(Vec::new())
            }
        }
    }

    /// Rewrites the whole log.
    pub async fn store_history(&self, entries: &[HistoryEntry]) -> Result<()> {
        let serialized =
            serde_json::to_string(entries).context("failed to serialize scan history")?;
        self.set_value(KEY_SCAN_HISTORY, serialized).await
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.remove_value(KEY_SCAN_HISTORY).await
    }
}
