// src/error.rs

use thiserror::Error;

pub type Result<T> = anyhow::Result<T>;

/// Failure of the hosted generation API. Reported to the user, never retried.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("quota exceeded: {0}")]
    Quota(String),

    #[error("API error ({code} {status}): {message}")]
    Api {
        code: u16,
        status: String,
        message: String,
    },

    #[error("response blocked: {0}")]
    Blocked(String),

    #[error("empty response: {0}")]
    EmptyResponse(String),
}

impl ProviderError {
    /// Classifies a non-success HTTP status into the matching variant.
    pub fn from_status(code: u16, status: &str, message: String) -> Self {
        match code {
            401 | 403 => ProviderError::Auth { status: code, message },
            429 => ProviderError::Quota(message),
            _ => ProviderError::Api {
                code,
                status: status.to_string(),
                message,
            },
        }
    }
}

/// Drops the request URL so nothing from it reaches the user or the logs.
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Network(err.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            ProviderError::from_status(401, "UNAUTHENTICATED", "bad key".into()),
            ProviderError::Auth { status: 401, .. }
        ));
        assert!(matches!(
            ProviderError::from_status(403, "PERMISSION_DENIED", "nope".into()),
            ProviderError::Auth { status: 403, .. }
        ));
        assert!(matches!(
            ProviderError::from_status(429, "RESOURCE_EXHAUSTED", "slow down".into()),
            ProviderError::Quota(_)
        ));
        let err = ProviderError::from_status(500, "INTERNAL", "boom".into());
        assert_eq!(err.to_string(), "API error (500 INTERNAL): boom");
    }
}
