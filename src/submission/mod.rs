pub mod client;
pub mod transport;

pub use client::{SubmissionClient, SubmissionOutcome, SubmissionResult, SubmitError};
pub use transport::{HttpTransport, SubmissionTransport, TransportError, SUBMISSION_CONTENT_TYPE};
