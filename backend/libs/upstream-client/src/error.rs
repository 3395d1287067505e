use thiserror::Error;

/// Errors returned by the upstream platform client.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Transport-level failure: connect error, timeout, TLS, body read.
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status that is not part of the endpoint contract.
    #[error("upstream returned status {0}")]
    Status(u16),

    /// Response body did not match the expected shape.
    #[error("upstream response could not be decoded: {0}")]
    Decode(String),

    /// An API-key endpoint was called without a configured key.
    #[error("upstream API key is not configured")]
    MissingCredentials,
}

impl UpstreamError {
    /// True for failures worth retrying on the next scheduled cycle.
    ///
    /// Transport errors and 5xx/429 statuses are transient; decode failures
    /// and missing credentials are not — retrying those without operator
    /// action cannot succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Http(_) => true,
            UpstreamError::Status(code) => *code >= 500 || *code == 429,
            UpstreamError::Decode(_) => false,
            UpstreamError::MissingCredentials => false,
        }
    }
}
