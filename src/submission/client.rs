use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{ScanOutcome, SubmissionConfig};

use super::transport::{SubmissionTransport, TransportError};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed endpoint response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Accepted,
    Duplicate,
    Rejected,
}

impl SubmissionOutcome {
    fn from_status(status: &str) -> Self {
        match status {
            "success" => SubmissionOutcome::Accepted,
            "duplicate" => SubmissionOutcome::Duplicate,
            _ => SubmissionOutcome::Rejected,
        }
    }

    /// Duplicates are recorded as failures: the sheet was not touched.
    pub fn history_outcome(&self) -> ScanOutcome {
        match self {
            SubmissionOutcome::Accepted => ScanOutcome::Success,
            SubmissionOutcome::Duplicate | SubmissionOutcome::Rejected => ScanOutcome::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    pub outcome: SubmissionOutcome,
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmissionBody<'a> {
    qr_data: &'a str,
    sheet_id: &'a str,
    sheet_name: &'a str,
}

#[derive(Deserialize)]
struct EndpointResponse {
    status: String,
    #[serde(default)]
    message: String,
}

/// Sends one payload per call; never retries.
pub struct SubmissionClient<T> {
    transport: T,
}

impl<T: SubmissionTransport> SubmissionClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub async fn submit(
        &self,
        payload: &str,
        config: &SubmissionConfig,
    ) -> Result<SubmissionResult, SubmitError> {
        let body = serde_json::to_string(&SubmissionBody {
            qr_data: payload,
            sheet_id: &config.sheet_id,
            sheet_name: &config.sheet_name,
        })
        .map_err(|err| TransportError::Request(err.to_string()))?;

        let raw = self.transport.post(&config.endpoint_url, body).await?;
        let result = parse_response(&raw)?;

        match result.outcome {
            SubmissionOutcome::Accepted => {
                log_info!("Submission accepted by sheet '{}'", config.sheet_name)
            }
            other => log_warn!("Submission {:?}: {}", other, result.message),
        }

        Ok(result)
    }
}

fn parse_response(raw: &str) -> Result<SubmissionResult, SubmitError> {
    let response: EndpointResponse = serde_json::from_str(raw.trim())
        .map_err(|err| SubmitError::MalformedResponse(err.to_string()))?;

    Ok(SubmissionResult {
        outcome: SubmissionOutcome::from_status(&response.status),
        message: response.message,
    })
}
