use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Http { status: StatusCode, url: String },
    #[error("Request timed out")]
    Timeout,
    #[error("Failed to decode response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether this error raises the controller's `has_failed` flag.
    ///
    /// Transport failures, timeouts, and HTTP 400-599 count as API failures.
    /// A body that arrives but decodes badly does not raise the flag; the
    /// payloads simply stay null for that cycle.
    pub fn is_api_failure(&self) -> bool {
        match self {
            FetchError::Request(_) | FetchError::Timeout => true,
            FetchError::Http { status, .. } => (400..600).contains(&status.as_u16()),
            FetchError::Decode(_) => false,
        }
    }
}
