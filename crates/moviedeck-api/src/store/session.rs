//! Session slice: the signed-in TMDB account.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authenticated TMDB user.
///
/// The session ID is obtained out-of-band and forwarded as-is on
/// personalized reads and list writes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// TMDB account ID.
    pub account_id: u64,
    /// TMDB v3 session ID.
    pub session_id: String,
}

impl UserSession {
    /// Creates a session.
    pub fn new(account_id: u64, session_id: impl Into<String>) -> Self {
        Self {
            account_id,
            session_id: session_id.into(),
        }
    }
}

impl fmt::Debug for UserSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserSession")
            .field("account_id", &self.account_id)
            .field("session_id", &"<redacted>")
            .finish()
    }
}

/// Mutations accepted by the session slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Sign in.
    SetUser(UserSession),
    /// Sign out.
    ClearUser,
}
