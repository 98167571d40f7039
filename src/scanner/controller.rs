use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::submission::SubmissionTransport;

use super::{decode::Decoder, frame::FrameSource, loop_worker::ScanSession, state::ScanState};

/// Owns the running scan task. One camera, so one session at a time.
pub struct ScannerController {
    handle: Option<JoinHandle<ScanState>>,
    cancel_token: Option<CancellationToken>,
}

impl ScannerController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn start<F, D, T>(&mut self, session: ScanSession<F, D, T>) -> Result<()>
    where
        F: FrameSource + 'static,
        D: Decoder,
        T: SubmissionTransport + 'static,
    {
        if self.is_active() {
            bail!("scanner already active");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(session.run(cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        info!("Scanner started");
        Ok(())
    }

    /// Stop scanning and wait for the task to hand the camera back. Returns
    /// how the session ended; `Closed` when nothing was running.
    pub async fn close(&mut self) -> Result<ScanState> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        match self.handle.take() {
            Some(handle) => {
                let state = handle.await.context("scan task failed to join")?;
                info!("Scanner closed ({state:?})");
                Ok(state)
            }
            None => Ok(ScanState::Closed),
        }
    }
}

impl Default for ScannerController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScannerController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
