pub mod config;
pub mod history;

pub use config::{KEY_ENDPOINT_URL, KEY_SHEET_ID, KEY_SHEET_NAME};
pub use history::KEY_SCAN_HISTORY;
