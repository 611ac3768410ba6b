//! Session persistence between invocations.

use crate::error::AppError;
use aula_core::{SessionContext, SessionState};
use std::io::ErrorKind;
use std::path::Path;

/// Load the saved session, or an anonymous one if the file does not exist.
pub fn load_session(path: &Path) -> Result<SessionContext, AppError> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let state: SessionState =
                serde_json::from_str(&text).map_err(|source| AppError::CorruptSession {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(SessionContext::init(state))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(SessionContext::new()),
        Err(source) => Err(AppError::SessionFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write the session state to `path`.
pub fn save_session(state: &SessionState, path: &Path) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json).map_err(|source| AppError::SessionFile {
        path: path.to_path_buf(),
        source,
    })
}
