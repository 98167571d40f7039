mod cli;
pub mod db;
pub mod history;
pub mod models;
pub mod scanner;
pub mod settings;
pub mod submission;
mod utils;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use db::Database;
use history::HistoryStore;
use settings::SettingsStore;

/// Long-lived stores shared by every command. Built once per process; the
/// scan loop receives explicit copies of what it needs.
pub struct AppState {
    pub db: Database,
    pub history: HistoryStore,
    pub settings: SettingsStore,
}

impl AppState {
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).with_context(|| {
            format!("failed to create data directory {}", data_dir.display())
        })?;

        let database = Database::new(data_dir.join("qread.sqlite3"))?;
        let history = HistoryStore::open(database.clone()).await?;
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        Ok(Self {
            db: database,
            history,
            settings,
        })
    }
}

pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = cli::Cli::parse();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("qread-worker")
        .build()
        .context("failed to start async runtime")
        .and_then(|runtime| runtime.block_on(cli::dispatch(cli)));

    if let Err(err) = result {
        log::error!("{err:#}");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
