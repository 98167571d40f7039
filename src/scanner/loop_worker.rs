use std::sync::Arc;

use chrono::Utc;
use tokio::{
    sync::mpsc::UnboundedSender,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    history::HistoryStore,
    models::{HistoryEntry, ScanOutcome, SubmissionConfig},
    settings::ScanSettings,
    submission::{SubmissionClient, SubmissionOutcome, SubmissionTransport},
};

use super::{
    decode::Decoder,
    frame::{capture_square, FrameSource},
    state::{Notice, ScanEvent, ScanState, Severity},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

const SEND_FAILED_MESSAGE: &str = "Failed to send data.";

/// One scan screen's worth of state: the camera it owns, the busy gate and
/// the collaborators every submission goes through.
pub struct ScanSession<F: FrameSource, D: Decoder, T: SubmissionTransport> {
    frames: F,
    decoder: Arc<D>,
    client: SubmissionClient<T>,
    config: SubmissionConfig,
    history: HistoryStore,
    settings: ScanSettings,
    events: UnboundedSender<ScanEvent>,
    state: ScanState,
    busy: bool,
}

impl<F, D, T> ScanSession<F, D, T>
where
    F: FrameSource,
    D: Decoder,
    T: SubmissionTransport,
{
    pub fn new(
        frames: F,
        decoder: D,
        client: SubmissionClient<T>,
        config: SubmissionConfig,
        history: HistoryStore,
        settings: ScanSettings,
        events: UnboundedSender<ScanEvent>,
    ) -> Self {
        Self {
            frames,
            decoder: Arc::new(decoder),
            client,
            config,
            history,
            settings,
            events,
            state: ScanState::Idle,
            busy: false,
        }
    }

    /// Drive the loop until `cancel` fires or the camera cannot be opened.
    /// The frame source is released before this returns, whichever way the
    /// session ends.
    pub async fn run(mut self, cancel: CancellationToken) -> ScanState {
        let final_state = tokio::select! {
            biased;
            _ = cancel.cancelled() => ScanState::Closed,
            state = self.drive() => state,
        };

        self.frames.release();
        self.busy = false;
        self.transition(final_state);
        log_info!("Scan session ended ({:?})", final_state);
        final_state
    }

    async fn drive(&mut self) -> ScanState {
        if let Err(err) = self.frames.open().await {
            log_error!("Camera could not be acquired: {err}");
            self.notify(Notice::error(format!("Camera unavailable: {err}")));
            return ScanState::Unavailable;
        }

        self.transition(ScanState::Scanning);

        let mut ticker = time::interval(self.settings.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(payload) = self.poll().await else {
                continue;
            };

            self.process(payload).await;
            ticker.reset();
        }
    }

    /// One capture + decode attempt.
    async fn poll(&mut self) -> Option<String> {
        if self.busy || self.state != ScanState::Scanning {
            return None;
        }

        let image = self.frames.grab()?;
        let edge = self.settings.scan_resolution;
        let decoder = Arc::clone(&self.decoder);

        let decoded = tokio::task::spawn_blocking(move || {
            let frame = capture_square(&image, edge);
            decoder.decode(&frame.pixels, frame.width, frame.height)
        })
        .await;

        match decoded {
            Ok(payload) => payload.filter(|p| !p.is_empty()),
            Err(err) => {
                log_error!("decode worker failed: {err}");
                None
            }
        }
    }

    async fn process(&mut self, payload: String) {
        self.busy = true;
        self.transition(ScanState::Submitting);
        log_debug!("Decoded payload ({} bytes)", payload.len());

        self.submit(&payload).await;

        self.transition(ScanState::Cooldown);
        time::sleep(self.settings.cooldown()).await;

        self.busy = false;
        self.transition(ScanState::Scanning);
    }

    async fn submit(&mut self, payload: &str) {
        if let Err(err) = self.config.validate() {
            log_warn!("Submission skipped: {err}");
            self.notify(Notice::error(format!(
                "App configuration is incomplete ({err}). Ask an admin to finish setup."
            )));
            return;
        }

        let (outcome, notice) = match self.client.submit(payload, &self.config).await {
            Ok(result) => {
                let notice = Notice::new(
                    severity_for(result.outcome),
                    message_or_default(result.outcome, result.message),
                );
                (result.outcome.history_outcome(), notice)
            }
            Err(err) => {
                log_error!("Error sending data: {err}");
                (ScanOutcome::Failed, Notice::error(SEND_FAILED_MESSAGE))
            }
        };

        self.notify(notice);

        let entry = HistoryEntry::record(payload, outcome, Utc::now());
        match self.history.append(entry.clone()).await {
            Ok(()) => self.emit(ScanEvent::Recorded(entry)),
            Err(err) => log_error!("Failed to record scan history: {err:#}"),
        }
    }

    fn transition(&mut self, next: ScanState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            log_warn!("Unexpected scan transition {:?} -> {:?}", self.state, next);
        }
        log_debug!("Scan state {:?} -> {:?}", self.state, next);
        self.state = next;
        self.emit(ScanEvent::StateChanged(next));
    }

    fn notify(&self, notice: Notice) {
        self.emit(ScanEvent::Notice(notice));
    }

    fn emit(&self, event: ScanEvent) {
        // Nobody listening is fine; the loop never depends on its audience.
        let _ = self.events.send(event);
    }
}

impl<F: FrameSource, D: Decoder, T: SubmissionTransport> Drop for ScanSession<F, D, T> {
    fn drop(&mut self) {
        if self.frames.is_active() {
            log_warn!("Scan session dropped with live camera; releasing");
            self.frames.release();
        }
    }
}

fn severity_for(outcome: SubmissionOutcome) -> Severity {
    match outcome {
        SubmissionOutcome::Accepted => Severity::Info,
        SubmissionOutcome::Duplicate => Severity::Warning,
        SubmissionOutcome::Rejected => Severity::Error,
    }
}

fn message_or_default(outcome: SubmissionOutcome, message: String) -> String {
    if !message.trim().is_empty() {
        return message;
    }
    match outcome {
        SubmissionOutcome::Accepted => "Data saved to sheet.".into(),
        SubmissionOutcome::Duplicate => "Data already recorded.".into(),
        SubmissionOutcome::Rejected => "Submission rejected by the sheet.".into(),
    }
}
