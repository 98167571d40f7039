use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

/// Tuning knobs for the scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Edge length of the square frame handed to the decoder.
    pub scan_resolution: u32,
    /// Delay between polls; ~60 Hz mirrors a display refresh cadence.
    pub poll_interval_ms: u64,
    /// Pause after every submission outcome before polling resumes.
    pub cooldown_ms: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            scan_resolution: 400,
            poll_interval_ms: 16,
            cooldown_ms: 2000,
        }
    }
}

impl ScanSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if !(64..=2048).contains(&self.scan_resolution) {
            bail!(
                "scan_resolution must be between 64 and 2048, got {}",
                self.scan_resolution
            );
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    scan: ScanSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!(
                    "Ignoring unreadable settings at {}: {err}",
                    path.display()
                );
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        if let Err(err) = data.scan.validate() {
            warn!(
                "Ignoring out-of-range scan settings at {}: {err}",
                path.display()
            );
            data.scan = ScanSettings::default();
        }

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn scan(&self) -> ScanSettings {
        self.read().scan
    }

    pub fn update_scan(&self, settings: ScanSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        let mut next = guard.clone();
        next.scan = settings;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
