use anyhow::{Context, Result};

use crate::{db::Database, models::SubmissionConfig};

pub const KEY_ENDPOINT_URL: &str = "apps_script_url";
pub const KEY_SHEET_ID: &str = "google_sheet_id";
pub const KEY_SHEET_NAME: &str = "google_sheet_name";

impl Database {
    /// Missing keys load as empty strings; callers validate before use.
    pub async fn load_submission_config(&self) -> Result<SubmissionConfig> {
        let endpoint_url = self.get_value(KEY_ENDPOINT_URL).await?.unwrap_or_default();
        let sheet_id = self.get_value(KEY_SHEET_ID).await?.unwrap_or_default();
        let sheet_name = self.get_value(KEY_SHEET_NAME).await?.unwrap_or_default();

        Ok(SubmissionConfig {
            endpoint_url,
            sheet_id,
            sheet_name,
        })
    }

    pub async fn save_submission_config(&self, config: &SubmissionConfig) -> Result<()> {
        config
            .validate()
            .context("refusing to save submission config")?;

        self.set_values(vec![
            (KEY_ENDPOINT_URL.to_string(), config.endpoint_url.trim().to_string()),
            (KEY_SHEET_ID.to_string(), config.sheet_id.trim().to_string()),
            (KEY_SHEET_NAME.to_string(), config.sheet_name.trim().to_string()),
        ])
        .await
    }
}
