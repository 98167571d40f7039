pub mod controller;
pub mod decode;
pub mod frame;
pub mod loop_worker;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use controller::ScannerController;
pub use decode::{Decoder, RqrrDecoder};
pub use frame::{capture_square, CameraError, FrameSource, LumaFrame, SpoolDirSource};
pub use loop_worker::ScanSession;
pub use state::{Notice, ScanEvent, ScanState, Severity};
