//! Fakes for the three scan capabilities plus a harness wiring them to a
//! real on-disk history store.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use image::DynamicImage;
use tempfile::TempDir;
use tokio::sync::{
    mpsc::{self, UnboundedReceiver},
    Semaphore,
};

use crate::{
    db::Database,
    history::HistoryStore,
    models::SubmissionConfig,
    settings::ScanSettings,
    submission::{SubmissionClient, SubmissionTransport, TransportError},
};

use super::{
    decode::Decoder,
    frame::{CameraError, FrameSource},
    loop_worker::ScanSession,
    state::{ScanEvent, ScanState},
};

const WAIT_LIMIT: Duration = Duration::from_secs(5);

pub fn valid_config() -> SubmissionConfig {
    SubmissionConfig::new(
        "https://script.google.com/macros/s/AKfy/exec",
        "sheet-1",
        "Tab",
    )
}

pub fn test_settings() -> ScanSettings {
    ScanSettings {
        scan_resolution: 64,
        poll_interval_ms: 1,
        cooldown_ms: 60,
    }
}

#[derive(Clone, Default)]
pub struct FakeFrames {
    pub grabs: Arc<AtomicUsize>,
    active: Arc<AtomicBool>,
    fail: Arc<AtomicBool>,
}

impl FakeFrames {
    pub fn is_live(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn fail_open(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

impl FrameSource for FakeFrames {
    async fn open(&mut self) -> Result<(), CameraError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CameraError::PermissionDenied("denied by test".into()));
        }
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn grab(&mut self) -> Option<DynamicImage> {
        if !self.is_live() {
            return None;
        }
        self.grabs.fetch_add(1, Ordering::SeqCst);
        Some(DynamicImage::new_luma8(8, 8))
    }

    fn release(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.is_live()
    }
}

/// Yields scripted payloads in order, then nothing.
#[derive(Clone, Default)]
pub struct FakeDecoder {
    pub calls: Arc<AtomicUsize>,
    script: Arc<Mutex<VecDeque<Option<String>>>>,
}

impl Decoder for FakeDecoder {
    fn decode(&self, _pixels: &[u8], _width: u32, _height: u32) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script.lock().unwrap().pop_front().flatten()
    }
}

struct TransportInner {
    replies: Mutex<VecDeque<Result<String, TransportError>>>,
    bodies: Mutex<Vec<String>>,
    calls: AtomicUsize,
    held: AtomicBool,
    gate: Semaphore,
}

/// Replies from a queue; an empty queue means the endpoint is unreachable.
/// When held, each request blocks until `release_one`.
#[derive(Clone)]
pub struct FakeTransport {
    inner: Arc<TransportInner>,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            inner: Arc::new(TransportInner {
                replies: Mutex::new(VecDeque::new()),
                bodies: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
                held: AtomicBool::new(false),
                gate: Semaphore::new(0),
            }),
        }
    }
}

impl FakeTransport {
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<serde_json::Value> {
        self.inner
            .bodies
            .lock()
            .unwrap()
            .iter()
            .map(|body| serde_json::from_str(body).unwrap())
            .collect()
    }

    pub fn hold(&self) {
        self.inner.held.store(true, Ordering::SeqCst);
    }

    pub fn release_one(&self) {
        self.inner.gate.add_permits(1);
    }

    pub async fn wait_for_calls(&self, n: usize) {
        wait_until(|| self.calls() >= n).await;
    }
}

impl SubmissionTransport for FakeTransport {
    async fn post(&self, _url: &str, body: String) -> Result<String, TransportError> {
        self.inner.bodies.lock().unwrap().push(body);
        self.inner.calls.fetch_add(1, Ordering::SeqCst);

        if self.inner.held.load(Ordering::SeqCst) {
            if let Ok(permit) = self.inner.gate.acquire().await {
                permit.forget();
            }
        }

        self.inner
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Unreachable("connection refused".into())))
    }
}

pub struct Harness {
    pub frames: FakeFrames,
    pub decoder: FakeDecoder,
    pub transport: FakeTransport,
    pub history: HistoryStore,
    config: SubmissionConfig,
    _dir: TempDir,
}

impl Harness {
    pub async fn new(config: SubmissionConfig) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("qread.sqlite3")).unwrap();
        let history = HistoryStore::open(db).await.unwrap();

        Self {
            frames: FakeFrames::default(),
            decoder: FakeDecoder::default(),
            transport: FakeTransport::default(),
            history,
            config,
            _dir: dir,
        }
    }

    pub fn session(
        &self,
        decodes: Vec<Option<&str>>,
        replies: Vec<Result<&str, TransportError>>,
    ) -> (
        ScanSession<FakeFrames, FakeDecoder, FakeTransport>,
        UnboundedReceiver<ScanEvent>,
    ) {
        self.decoder
            .script
            .lock()
            .unwrap()
            .extend(decodes.into_iter().map(|d| d.map(str::to_string)));
        self.transport
            .inner
            .replies
            .lock()
            .unwrap()
            .extend(replies.into_iter().map(|r| r.map(str::to_string)));

        let (tx, rx) = mpsc::unbounded_channel();
        let session = ScanSession::new(
            self.frames.clone(),
            self.decoder.clone(),
            SubmissionClient::new(self.transport.clone()),
            self.config.clone(),
            self.history.clone(),
            test_settings(),
            tx,
        );
        (session, rx)
    }

    pub async fn wait_for_grabs(&self, n: usize) {
        wait_until(|| self.frames.grabs.load(Ordering::SeqCst) >= n).await;
    }
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT_LIMIT, async {
        while !ready() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Receive events until one matches; returns everything seen, match included.
pub async fn wait_for(
    rx: &mut UnboundedReceiver<ScanEvent>,
    mut matches: impl FnMut(&ScanEvent) -> bool,
) -> Vec<ScanEvent> {
    let mut seen = Vec::new();
    tokio::time::timeout(WAIT_LIMIT, async {
        while let Some(event) = rx.recv().await {
            let done = matches(&event);
            seen.push(event);
            if done {
                return;
            }
        }
        panic!("event channel closed before match; saw {seen:?}");
    })
    .await
    .expect("expected scan event not received in time");
    seen
}

pub fn drain(rx: &mut UnboundedReceiver<ScanEvent>) -> Vec<ScanEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = rx.try_recv() {
        seen.push(event);
    }
    seen
}

pub fn states(events: &[ScanEvent]) -> Vec<ScanState> {
    events
        .iter()
        .filter_map(|event| match event {
            ScanEvent::StateChanged(state) => Some(*state),
            _ => None,
        })
        .collect()
}
