use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ScanOutcome {
    Success,
    Failed,
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Success => "success",
            ScanOutcome::Failed => "failed",
        }
    }
}

/// Coarse classification of a payload shown next to each history row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PayloadKind {
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "Text")]
    Text,
}

impl PayloadKind {
    pub fn classify(payload: &str) -> Self {
        let lower = payload.trim_start().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            PayloadKind::Url
        } else {
            PayloadKind::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Url => "URL",
            PayloadKind::Text => "Text",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub payload: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: ScanOutcome,
    pub sheet_updated: bool,
    #[serde(rename = "type")]
    pub kind: PayloadKind,
}

impl HistoryEntry {
    /// Only an accepted submission counts as a sheet update.
    pub fn record(payload: &str, outcome: ScanOutcome, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payload: payload.to_string(),
            timestamp,
            outcome,
            sheet_updated: outcome == ScanOutcome::Success,
            kind: PayloadKind::classify(payload),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryStats {
    pub success: usize,
    pub failed: usize,
    pub synced: usize,
}

impl HistoryStats {
    pub fn from_entries(entries: &[HistoryEntry]) -> Self {
        entries.iter().fold(Self::default(), |mut stats, entry| {
            stats.add(entry);
            stats
        })
    }

    pub fn add(&mut self, entry: &HistoryEntry) {
        match entry.outcome {
            ScanOutcome::Success => self.success += 1,
            ScanOutcome::Failed => self.failed += 1,
        }
        if entry.sheet_updated {
            self.synced += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}
