use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LinkedInError>;

#[derive(Debug, Error)]
pub enum LinkedInError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("LinkedIn API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("access token is no longer valid: {reason}")]
    TokenInvalidated { reason: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed realtime event: {0}")]
    MalformedEvent(String),

    #[error("unknown realtime topic `{0}`")]
    UnknownTopic(String),

    #[error("operation canceled")]
    Canceled,

    #[error("invalid URN `{0}`")]
    InvalidUrn(String),

    #[error("URN `{0}` carries a tuple id where a single id was expected")]
    TupleUrn(String),

    #[error("invalid cookie header: {0}")]
    InvalidCookie(String),

    #[error("required cookie `{0}` is missing")]
    MissingCookie(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl LinkedInError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn api(status: StatusCode, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    pub fn token_invalidated(reason: impl Into<String>) -> Self {
        Self::TokenInvalidated {
            reason: reason.into(),
        }
    }

    /// Whether the realtime loop should reconnect after this error.
    pub fn is_transient(&self) -> bool {
        match self {
            LinkedInError::Network(_) | LinkedInError::Io(_) => true,
            LinkedInError::Api { status, .. } => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            LinkedInError::Api { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_transient_statuses() {
        assert!(LinkedInError::api(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(LinkedInError::api(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(!LinkedInError::api(StatusCode::BAD_REQUEST, "").is_transient());
        assert!(!LinkedInError::token_invalidated("logout").is_transient());
        assert!(!LinkedInError::Canceled.is_transient());
    }

    #[test]
    fn detects_unauthorized() {
        assert!(LinkedInError::api(StatusCode::UNAUTHORIZED, "").is_unauthorized());
        assert!(LinkedInError::api(StatusCode::FORBIDDEN, "").is_unauthorized());
        assert!(!LinkedInError::api(StatusCode::NOT_FOUND, "").is_unauthorized());
    }
}
