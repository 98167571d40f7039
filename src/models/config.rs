use thiserror::Error;

/// Prefix every Apps Script web app deployment URL starts with.
pub const ENDPOINT_URL_PREFIX: &str = "https://script.google.com/macros/s/";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("endpoint URL must start with https://script.google.com/macros/s/")]
    InvalidEndpointUrl,
    #[error("configuration incomplete: {0} is empty")]
    MissingField(&'static str),
}

/// Destination of every submission: the web app plus the target sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionConfig {
    pub endpoint_url: String,
    pub sheet_id: String,
    pub sheet_name: String,
}

impl SubmissionConfig {
    pub fn new(
        endpoint_url: impl Into<String>,
        sheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            sheet_id: sheet_id.into(),
            sheet_name: sheet_name.into(),
        }
    }

    /// URL shape is checked before field presence, so an empty URL reports
    /// `InvalidEndpointUrl` the same way the admin form does.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint_url.starts_with(ENDPOINT_URL_PREFIX) {
            return Err(ConfigError::InvalidEndpointUrl);
        }
        if self.sheet_id.trim().is_empty() {
            return Err(ConfigError::MissingField("sheet_id"));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(ConfigError::MissingField("sheet_name"));
        }
        Ok(())
    }
}
