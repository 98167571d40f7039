use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;

use crate::{
    db::Database,
    models::{HistoryEntry, HistoryStats},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Default)]
struct HistoryState {
    entries: Vec<HistoryEntry>,
    stats: HistoryStats,
}

/// Append-only scan log with its statistics cached in memory.
///
/// Every mutation holds the state lock across the database write and only
/// touches memory once the write has landed.
#[derive(Clone)]
pub struct HistoryStore {
    db: Database,
    state: Arc<Mutex<HistoryState>>,
}

impl HistoryStore {
    pub async fn open(db: Database) -> Result<Self> {
        let entries = db
            .load_history()
            .await
            .context("failed to load scan history")?;
        let stats = HistoryStats::from_entries(&entries);
        log_info!("Loaded {} history entries", entries.len());

        Ok(Self {
            db,
            state: Arc::new(Mutex::new(HistoryState { entries, stats })),
        })
    }

    /// Persists the extended log, then swaps it in with the updated stats.
    /// The write runs on its own task holding the state lock, so dropping
    /// the caller mid-write still leaves memory and disk in step.
    pub async fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut state = Arc::clone(&self.state).lock_owned().await;
        let db = self.db.clone();

        let write = tokio::spawn(async move {
            let mut entries = state.entries.clone();
            entries.push(entry);

            if let Err(err) = db.store_history(&entries).await {
                log_warn!("History append not persisted: {err:#}");
                return Err(err.context("failed to persist history entry"));
            }

            if let Some(last) = entries.last() {
                state.stats.add(last);
            }
            state.entries = entries;
            Ok(())
        });

        write.await.context("history writer task failed")?
    }

    /// Newest first.
    pub async fn entries(&self) -> Vec<HistoryEntry> {
        let state = self.state.lock().await;
        state.entries.iter().rev().cloned().collect()
    }

    pub async fn stats(&self) -> HistoryStats {
        self.state.lock().await.stats
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn clear(&self) -> Result<()> {
        let mut state = Arc::clone(&self.state).lock_owned().await;
        let db = self.db.clone();

        let write = tokio::spawn(async move {
            db.clear_history()
                .await
                .context("failed to clear scan history")?;
            *state = HistoryState::default();
            log_info!("Scan history cleared");
            Ok::<_, anyhow::Error>(())
        });

        write.await.context("history writer task failed")?
    }
}
