use aula_core::SessionError;
use thiserror::Error;

/// Errors from the Aula SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The API rejected the credentials; the session was dropped.
    #[error("session expired ({status}), please log in again")]
    SessionExpired { status: u16 },

    /// No token is held; log in first.
    #[error("not logged in")]
    NotAuthenticated,

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl Error {
    /// Whether the server said the record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Server { status: 404, .. })
    }
}
