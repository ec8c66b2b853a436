//! Session model representing an authenticated Tableau sign-in.

use chrono::{DateTime, Utc};

/// Credentials returned by a successful sign-in.
///
/// A session is treated as valid for the lifetime of the process. When the
/// server rejects it later, the failure surfaces to the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Opaque token sent with every subsequent request.
    pub auth_token: String,
    /// Site LUID the token is scoped to.
    pub site_id: String,
    /// When the sign-in completed.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session.
    pub fn new(auth_token: String, site_id: String) -> Self {
        Self {
            auth_token,
            site_id,
            created_at: Utc::now(),
        }
    }
}

// Manual impl keeps the token out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("auth_token", &"<redacted>")
            .field("site_id", &self.site_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}
