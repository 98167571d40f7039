use std::future::Future;

use thiserror::Error;

/// Content type the Apps Script endpoint expects. Plain text keeps the
/// request "simple" so the web app never has to answer a CORS preflight.
pub const SUBMISSION_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request could not be built: {0}")]
    Request(String),
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("response body unreadable: {0}")]
    Body(String),
}

/// Outbound half of a submission: one POST, raw response body back.
pub trait SubmissionTransport: Send + Sync {
    fn post(
        &self,
        url: &str,
        body: String,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// `reqwest`-backed transport. No explicit timeout: the client's
/// defaults apply, and redirects are followed (Apps Script answers
/// every POST with a redirect to the script output).
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("qread/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| TransportError::Request(err.to_string()))?;
        Ok(Self { client })
    }
}

impl SubmissionTransport for HttpTransport {
    async fn post(&self, url: &str, body: String) -> Result<String, TransportError> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, SUBMISSION_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|err| TransportError::Unreachable(err.to_string()))?;

        response
            .text()
            .await
            .map_err(|err| TransportError::Body(err.to_string()))
    }
}
