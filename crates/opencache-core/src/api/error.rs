use thiserror::Error;

/// Failure of a single request against the geocache service.
///
/// Every variant is recoverable: the worst outcome for a caller is a stale
/// or incomplete map.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The fetch task died before producing a result (e.g. the source panicked)
    #[error("Fetch task failed: {0}")]
    TaskFailed(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }

        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        ApiError::Status {
            status,
            body: Self::truncate_body(body),
        }
    }

    /// Whether a later attempt at the same request could plausibly succeed.
    ///
    /// The client never retries on its own; this only informs failure hooks.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ApiError::Status { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Decode(_) | ApiError::InvalidRequest(_) | ApiError::TaskFailed(_) => false,
        }
    }
}
