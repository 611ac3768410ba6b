//! # Session Module
//!
//! The application-session context.
//!
//! Holds the bearer token and the logged-in user, and decides what an
//! authorization failure means. Every transition is an explicit method;
//! persistence is the caller's job through [`SessionContext::snapshot`] and
//! [`SessionContext::init`].
//!
//! ```text
//!              login                   begin_logout
//! Anonymous ─────────► Authenticated ────────────► LoggingOut
//!     ▲                      │                         │
//!     │   on_unauthorized    │        finish_logout    │
//!     └──────(expired)───────┘◄────────────────────────┘
//! ```

use crate::error::SessionError;
use crate::model::{Role, User};
use serde::{Deserialize, Serialize};

/// Message shown at the login view after an expiry.
pub const EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";

/// Session states. Also the persisted form of the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No credentials. `expired` is set when the last session was cut by
    /// an authorization failure and the user has not been told yet.
    Anonymous {
        #[serde(default)]
        expired: bool,
    },
    Authenticated { token: String, user: User },
    /// The user asked to log out; authorization failures are expected and
    /// must not be reported as an expiry.
    LoggingOut { token: String, user: User },
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Anonymous { expired: false }
    }
}

/// What the caller must do after an authorization failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerdict {
    /// Session cut: go back to the login view.
    RedirectToLogin,
    /// A manual logout is in progress; nothing to do.
    Ignore,
}

/// Explicit session context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    state: SessionState,
}

impl SessionContext {
    /// Anonymous context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore from a persisted state.
    #[must_use]
    pub fn init(state: SessionState) -> Self {
        Self { state }
    }

    /// State to persist.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.state.clone()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Drop every credential and flag.
    pub fn teardown(&mut self) {
        self.state = SessionState::default();
    }

    /// Store credentials after a successful login.
    pub fn login(&mut self, token: impl Into<String>, user: User) {
        self.state = SessionState::Authenticated {
            token: token.into(),
            user,
        };
    }

    /// Mark a user-initiated logout as started.
    pub fn begin_logout(&mut self) -> Result<(), SessionError> {
        match std::mem::take(&mut self.state) {
            SessionState::Authenticated { token, user }
            | SessionState::LoggingOut { token, user } => {
                self.state = SessionState::LoggingOut { token, user };
                Ok(())
            }
            anonymous @ SessionState::Anonymous { .. } => {
                self.state = anonymous;
                Err(SessionError::NotLoggedIn)
            }
        }
    }

    /// Complete a logout; no expiry message is left behind.
    pub fn finish_logout(&mut self) {
        self.state = SessionState::Anonymous { expired: false };
    }

    /// React to a 401/403 from the API.
    ///
    /// Outside a manual logout the session is considered expired: the
    /// credentials are dropped and the expiry message is armed.
    pub fn on_unauthorized(&mut self) -> AuthVerdict {
        match self.state {
            SessionState::LoggingOut { .. } => AuthVerdict::Ignore,
            _ => {
                self.state = SessionState::Anonymous { expired: true };
                AuthVerdict::RedirectToLogin
            }
        }
    }

    /// The expiry message, once. Returns `None` on later calls.
    pub fn take_expired_notice(&mut self) -> Option<&'static str> {
        if let SessionState::Anonymous { expired } = &mut self.state {
            if *expired {
                *expired = false;
                return Some(EXPIRED_MESSAGE);
            }
        }
        None
    }

    /// Whether the last session ended by expiry and nobody saw it yet.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        matches!(self.state, SessionState::Anonymous { expired: true })
    }

    /// Bearer token, while credentials are held.
    pub fn token(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { token, .. } | SessionState::LoggingOut { token, .. } => {
                Some(token)
            }
            SessionState::Anonymous { .. } => None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        match &self.state {
            SessionState::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    /// Route guard: the logged-in user, if it holds `role`.
    pub fn require_role(&self, role: Role) -> Result<&User, SessionError> {
        let user = self.user().ok_or(SessionError::NotLoggedIn)?;
        if user.role == role {
            Ok(user)
        } else {
            Err(SessionError::WrongRole {
                required: role,
                actual: user.role,
            })
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
