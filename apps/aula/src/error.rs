use aula_core::{EditError, FormError, Notice, SessionError};
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] aula_sdk::Error),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session file could not be read or written.
    #[error("session file {}: {source}", path.display())]
    SessionFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The session file exists but does not parse.
    #[error("session file {} is corrupt: {source}", path.display())]
    CorruptSession {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),

    /// A teacher asked for a student outside their courses.
    #[error("student {0} is not in any of your courses")]
    StudentNotFound(String),

    /// Arguments that parse but make no sense together.
    #[error("{0}")]
    Usage(String),
}

impl AppError {
    /// One-line message for the terminal.
    #[must_use]
    pub fn notice(&self) -> Notice {
        match self {
            Self::Edit(e) => e.notice(),
            Self::Api(aula_sdk::Error::SessionExpired { .. }) => {
                Notice::warning("session expired, please log in again")
            }
            other => Notice::error(other.to_string()),
        }
    }
}
