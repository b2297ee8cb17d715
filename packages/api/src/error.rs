//! Errors raised at the backend boundary.

use thiserror::Error;

/// A failed backend call, before any localisation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The backend answered with a non-success status. `message` is the
    /// backend's own text, e.g. `"Invalid login credentials"`.
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    /// The operation needs a signed-in session and none is cached.
    #[error("Auth session missing!")]
    SessionMissing,
}

impl BackendError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether the backend itself rejected the call (as opposed to the call
    /// never completing).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::SessionMissing)
    }

    /// Whether a failed token exchange means the refresh token itself is no
    /// good. Server errors and transport faults leave the session usable.
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self,
            Self::Api {
                status: 400 | 401 | 403 | 404,
                ..
            } | Self::SessionMissing
        )
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_backend_message() {
        let e = BackendError::api(400, "Invalid login credentials");
        assert_eq!(e.to_string(), "Invalid login credentials");
        assert!(e.is_rejection());
    }

    #[test]
    fn test_network_error_is_not_a_rejection() {
        let e = BackendError::Network("connection refused".to_string());
        assert!(!e.is_rejection());
        assert_eq!(e.to_string(), "network error: connection refused");
    }

    #[test]
    fn test_only_client_errors_invalidate_session() {
        assert!(BackendError::api(400, "Invalid Refresh Token: Refresh Token Not Found")
            .invalidates_session());
        assert!(BackendError::api(401, "invalid JWT").invalidates_session());
        assert!(BackendError::SessionMissing.invalidates_session());

        for status in [429, 500, 502, 503] {
            let e = BackendError::api(status, "upstream unavailable");
            assert!(e.is_rejection());
            assert!(!e.invalidates_session(), "{status}");
        }
        assert!(!BackendError::Network("timed out".to_string()).invalidates_session());
        assert!(!BackendError::Decode("eof".to_string()).invalidates_session());
    }
}
