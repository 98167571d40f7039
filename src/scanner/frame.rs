use std::{
    collections::HashSet,
    future::Future,
    io,
    path::{Path, PathBuf},
};

use image::{imageops::FilterType, DynamicImage};
use thiserror::Error;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("no camera available: {0}")]
    Unavailable(String),
}

/// Live stream of frames owned by exactly one scan session.
pub trait FrameSource: Send {
    /// Acquire the device. Resolves once frames can be grabbed.
    fn open(&mut self) -> impl Future<Output = Result<(), CameraError>> + Send;

    /// Latest frame, or `None` when the stream has nothing new yet.
    fn grab(&mut self) -> Option<DynamicImage>;

    /// Stop the stream. Safe to call more than once.
    fn release(&mut self);

    fn is_active(&self) -> bool;
}

/// Grayscale frame at decode resolution.
#[derive(Debug, Clone)]
pub struct LumaFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Stretch `image` onto an `edge`×`edge` square and drop color. Aspect
/// ratio is not preserved; decode cost stays bounded whatever the
/// source resolution.
pub fn capture_square(image: &DynamicImage, edge: u32) -> LumaFrame {
    let scaled = image.resize_exact(edge, edge, FilterType::Triangle).to_luma8();
    let (width, height) = scaled.dimensions();
    LumaFrame {
        pixels: scaled.into_raw(),
        width,
        height,
    }
}

/// Frames dropped as image files into a directory by an external capture
/// tool. Each file is one frame, consumed once in file-name order; files
/// written after the session started are picked up on later polls.
pub struct SpoolDirSource {
    dir: PathBuf,
    active: bool,
    consumed: HashSet<PathBuf>,
}

impl SpoolDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            active: false,
            consumed: HashSet::new(),
        }
    }

    fn next_pending(&self) -> io::Result<Option<PathBuf>> {
        let mut pending: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_frame_file(path))
            .filter(|path| !self.consumed.contains(path))
            .collect();
        pending.sort();
        Ok(pending.into_iter().next())
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn camera_error(dir: &Path, err: io::Error) -> CameraError {
    let detail = format!("{}: {err}", dir.display());
    match err.kind() {
        io::ErrorKind::PermissionDenied => CameraError::PermissionDenied(detail),
        _ => CameraError::Unavailable(detail),
    }
}

impl FrameSource for SpoolDirSource {
    async fn open(&mut self) -> Result<(), CameraError> {
        let metadata = tokio::fs::metadata(&self.dir)
            .await
            .map_err(|err| camera_error(&self.dir, err))?;
        if !metadata.is_dir() {
            return Err(CameraError::Unavailable(format!(
                "{} is not a directory",
                self.dir.display()
            )));
        }
        tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|err| camera_error(&self.dir, err))?;

        self.active = true;
        log_info!("Frame spool opened at {}", self.dir.display());
        Ok(())
    }

    fn grab(&mut self) -> Option<DynamicImage> {
        if !self.active {
            return None;
        }

        let path = match self.next_pending() {
            Ok(next) => next?,
            Err(err) => {
                log_warn!("Frame spool unreadable: {err}");
                return None;
            }
        };
        self.consumed.insert(path.clone());

        match image::open(&path) {
            Ok(image) => Some(image),
            Err(err) => {
                log_warn!("Skipping unreadable frame {}: {err}", path.display());
                None
            }
        }
    }

    fn release(&mut self) {
        if self.active {
            log_info!("Frame spool released ({} frames consumed)", self.consumed.len());
        }
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
