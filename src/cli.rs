use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, warn};
use tokio::sync::mpsc;

use crate::{
    models::{HistoryEntry, SubmissionConfig},
    scanner::{
        capture_square, Decoder, Notice, RqrrDecoder, ScanEvent, ScanSession, ScanState,
        ScannerController, Severity, SpoolDirSource,
    },
    settings::ScanSettings,
    submission::{HttpTransport, SubmissionClient},
    AppState,
};

#[derive(Parser, Debug)]
#[command(
    name = "qread",
    version,
    about = "Scan QR codes and relay them to a Google Sheet"
)]
pub struct Cli {
    /// Where the database and settings file live
    #[arg(long, env = "QREAD_DATA_DIR", default_value = ".qread", global = true)]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan frames dropped into a spool directory until Ctrl-C
    Scan {
        /// Directory a capture tool writes frames into
        #[arg(long)]
        frames: PathBuf,
    },
    /// Show or change the submission target
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Inspect or clear the scan history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Show or change scan tuning
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Decode a single image and print its payload
    Decode { image: PathBuf },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    Set(ConfigArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Apps Script web app URL (https://script.google.com/macros/s/...)
    #[arg(long)]
    url: String,
    /// Spreadsheet id, as found in the sheet URL
    #[arg(long)]
    sheet_id: String,
    /// Target tab inside the spreadsheet
    #[arg(long)]
    sheet_name: String,
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    List {
        /// Show at most this many entries, newest first
        #[arg(long)]
        limit: Option<usize>,
    },
    Stats,
    Clear {
        /// Confirm deleting every entry
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Show,
    Set {
        #[arg(long)]
        scan_resolution: Option<u32>,
        #[arg(long)]
        poll_interval_ms: Option<u64>,
        #[arg(long)]
        cooldown_ms: Option<u64>,
    },
}

pub async fn dispatch(cli: Cli) -> Result<()> {
    let state = AppState::open(&cli.data_dir).await?;

    match cli.command {
        Command::Scan { frames } => scan_cmd(&state, frames).await,
        Command::Config { action } => config_cmd(&state, action).await,
        Command::History { action } => history_cmd(&state, action).await,
        Command::Settings { action } => settings_cmd(&state, action),
        Command::Decode { image } => decode_cmd(&state, &image).await,
    }
}

async fn scan_cmd(state: &AppState, frames: PathBuf) -> Result<()> {
    // Loaded once; changes made while scanning apply to the next session.
    let config = state.db.load_submission_config().await?;
    if let Err(err) = config.validate() {
        warn!("Scanning with incomplete configuration: {err}");
    }

    let transport = HttpTransport::new()?;
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let session = ScanSession::new(
        SpoolDirSource::new(&frames),
        RqrrDecoder,
        SubmissionClient::new(transport),
        config,
        state.history.clone(),
        state.settings.scan(),
        events_tx,
    );

    let mut controller = ScannerController::new();
    controller.start(session)?;
    println!("Scanning frames in {} (Ctrl-C to close)", frames.display());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events_rx.recv() => match event {
                Some(ScanEvent::Notice(notice)) => print_notice(&notice),
                Some(ScanEvent::Recorded(entry)) => debug!("Recorded {}", entry.id),
                Some(ScanEvent::StateChanged(next)) if next.is_terminal() => break,
                Some(ScanEvent::StateChanged(next)) => debug!("Scanner is {next:?}"),
                None => break,
            },
        }
    }

    match controller.close().await? {
        ScanState::Unavailable => bail!("camera unavailable; check {}", frames.display()),
        _ => {
            println!("Scanner closed");
            Ok(())
        }
    }
}

fn print_notice(notice: &Notice) {
    let label = match notice.severity {
        Severity::Info => "ok",
        Severity::Warning => "warning",
        Severity::Error => "error",
    };
    println!("[{label}] {}", notice.message);
}

async fn config_cmd(state: &AppState, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = state.db.load_submission_config().await?;
            println!("endpoint url: {}", or_unset(&config.endpoint_url));
            println!("sheet id:     {}", or_unset(&config.sheet_id));
            println!("sheet name:   {}", or_unset(&config.sheet_name));
            match config.validate() {
                Ok(()) => println!("status:       ready"),
                Err(err) => println!("status:       {err}"),
            }
        }
        ConfigAction::Set(args) => {
            let config = SubmissionConfig::new(args.url, args.sheet_id, args.sheet_name);
            state.db.save_submission_config(&config).await?;
            println!("Configuration saved");
        }
    }
    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(unset)"
    } else {
        value
    }
}

async fn history_cmd(state: &AppState, action: HistoryAction) -> Result<()> {
    match action {
        HistoryAction::List { limit } => {
            let entries = state.history.entries().await;
            if entries.is_empty() {
                println!("No scans yet");
                return Ok(());
            }
            for entry in entries.iter().take(limit.unwrap_or(usize::MAX)) {
                println!("{}", format_entry(entry));
            }
        }
        HistoryAction::Stats => {
            let stats = state.history.stats().await;
            println!("success: {}", stats.success);
            println!("failed:  {}", stats.failed);
            println!("synced:  {}", stats.synced);
            println!("total:   {}", stats.total());
        }
        HistoryAction::Clear { yes } => {
            if !yes {
                bail!("refusing to clear history without --yes");
            }
            state.history.clear().await?;
            println!("History cleared");
        }
    }
    Ok(())
}

fn format_entry(entry: &HistoryEntry) -> String {
    format!(
        "{}  {:<7}  {:<4}  {}  {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
        entry.outcome.as_str(),
        entry.kind.as_str(),
        if entry.sheet_updated { "synced" } else { "      " },
        entry.payload
    )
}

fn settings_cmd(state: &AppState, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Show => print_settings(&state.settings.scan()),
        SettingsAction::Set {
            scan_resolution,
            poll_interval_ms,
            cooldown_ms,
        } => {
            let current = state.settings.scan();
            let next = ScanSettings {
                scan_resolution: scan_resolution.unwrap_or(current.scan_resolution),
                poll_interval_ms: poll_interval_ms.unwrap_or(current.poll_interval_ms),
                cooldown_ms: cooldown_ms.unwrap_or(current.cooldown_ms),
            };
            state.settings.update_scan(next)?;
            print_settings(&next);
        }
    }
    Ok(())
}

fn print_settings(settings: &ScanSettings) {
    println!("scan resolution:  {}px", settings.scan_resolution);
    println!("poll interval:    {}ms", settings.poll_interval_ms);
    println!("cooldown:         {}ms", settings.cooldown_ms);
}

async fn decode_cmd(state: &AppState, image: &Path) -> Result<()> {
    let edge = state.settings.scan().scan_resolution;
    let path = image.to_path_buf();

    let payload = tokio::task::spawn_blocking(move || -> Result<Option<String>> {
        let img = image::open(&path)
            .with_context(|| format!("failed to open image {}", path.display()))?;
        let frame = capture_square(&img, edge);
        Ok(RqrrDecoder.decode(&frame.pixels, frame.width, frame.height))
    })
    .await
    .context("decode worker failed")??;

    match payload {
        Some(payload) => {
            println!("{payload}");
            Ok(())
        }
        None => bail!("no QR code found in {}", image.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScanOutcome;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parses_scan_with_global_data_dir() {
        let cli = Cli::try_parse_from(["qread", "scan", "--frames", "/tmp/frames", "--data-dir", "/tmp/q"])
            .unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/q"));
        assert!(matches!(cli.command, Command::Scan { frames } if frames == PathBuf::from("/tmp/frames")));
    }

    #[test]
    fn config_set_requires_all_fields() {
        let err = Cli::try_parse_from(["qread", "config", "set", "--url", "https://x"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn history_clear_defaults_to_unconfirmed() {
        let cli = Cli::try_parse_from(["qread", "history", "clear"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::History {
                action: HistoryAction::Clear { yes: false }
            }
        ));
    }

    #[test]
    fn entry_line_shows_outcome_kind_and_sync() {
        let mut entry = HistoryEntry::record(
            "https://example.com/t/1",
            ScanOutcome::Success,
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap(),
        );
        let line = format_entry(&entry);
        assert!(line.starts_with("2026-03-01 08:30:00  success"));
        assert!(line.contains("URL"));
        assert!(line.contains("synced"));

        entry.sheet_updated = false;
        assert!(!format_entry(&entry).contains("synced"));
    }

    #[tokio::test]
    async fn clear_without_confirmation_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(dir.path()).await.unwrap();
        state
            .history
            .append(HistoryEntry::record("x", ScanOutcome::Failed, Utc::now()))
            .await
            .unwrap();

        let err = history_cmd(&state, HistoryAction::Clear { yes: false })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--yes"));
        assert_eq!(state.history.len().await, 1);

        history_cmd(&state, HistoryAction::Clear { yes: true })
            .await
            .unwrap();
        assert_eq!(state.history.len().await, 0);
    }

    #[tokio::test]
    async fn config_set_then_show_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(dir.path()).await.unwrap();

        let bad = ConfigArgs {
            url: "http://localhost/hook".into(),
            sheet_id: "id".into(),
            sheet_name: "Tab".into(),
        };
        assert!(config_cmd(&state, ConfigAction::Set(bad)).await.is_err());

        let good = ConfigArgs {
            url: "https://script.google.com/macros/s/AKfy/exec".into(),
            sheet_id: "id".into(),
            sheet_name: "Tab".into(),
        };
        config_cmd(&state, ConfigAction::Set(good)).await.unwrap();
        assert_eq!(state.db.load_submission_config().await.unwrap().validate(), Ok(()));
    }

    #[tokio::test]
    async fn decode_reports_missing_code() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::open(&dir.path().join("data")).await.unwrap();
        let blank = dir.path().join("blank.png");
        image::GrayImage::from_pixel(32, 32, image::Luma([255u8]))
            .save(&blank)
            .unwrap();

        let err = decode_cmd(&state, &blank).await.unwrap_err();
        assert!(err.to_string().contains("no QR code found"));
    }
}
