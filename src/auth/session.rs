//! Session records and scopes.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a session stays valid.
pub const SESSION_TTL_HOURS: i64 = 24;

/// How a session was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// The folder carried no password marker when first visited.
    Public,
    /// A password submission was accepted for the folder.
    Authenticated,
}

/// A time-bounded authorization record scoped to exactly one folder.
///
/// Serialized into the session store as JSON; a record that fails to
/// deserialize is evicted and access is re-derived from scratch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    /// The folder this session authorizes.
    pub folder_id: String,
    /// When the session was issued.
    pub issued_at: DateTime<Utc>,
    /// How the session was obtained.
    pub scope: Scope,
    /// When the session lapses.
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// Creates a session issued at `issued_at` for `folder_id`.
    #[must_use]
    pub fn new(folder_id: impl Into<String>, scope: Scope, issued_at: DateTime<Utc>) -> Self {
        Self {
            folder_id: folder_id.into(),
            issued_at,
            scope,
            expires_at: issued_at + Duration::hours(SESSION_TTL_HOURS),
        }
    }

    /// Whether the session has outlived its TTL as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.issued_at > Duration::hours(SESSION_TTL_HOURS)
    }
}
