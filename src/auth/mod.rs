//! Session-scoped authorization for gated folders.
//!
//! Folders may be password-gated via a marker file. Access decisions are
//! cached per folder in an ephemeral [`SessionStore`] for the lifetime of a
//! browsing session, so a visitor types a password at most once per folder
//! per day.
//!
//! # Overview
//!
//! [`SessionAuthCache::authorize`] resolves to [`Authorization::Granted`] or
//! [`Authorization::Denied`]:
//! 1. No stored session: probe the folder for its password marker. Marker
//!    absent → synthesize a `Public` session and grant. Marker present →
//!    deny, directing the caller to the password entry flow.
//! 2. Stored session for a different folder: deny (invalid session).
//! 3. `Public` session: grant.
//! 4. `Authenticated` session past its TTL: evict and deny (expired).
//! 5. Otherwise: grant.
//!
//! [`SessionAuthCache::submit_password`] compares the candidate against the
//! marker's content (whitespace-insensitive, case-sensitive) and issues an
//! `Authenticated` session on match. Denials and rejections are values, not
//! errors, and are never retried automatically.

pub(crate) mod markers;
mod session;
mod store;

pub use markers::{DOWNLOAD_MARKER, PASSWORD_MARKER, marker_enables_download, normalize_secret};
pub use session::{AuthSession, SESSION_TTL_HOURS, Scope};
pub use store::{MemorySessionStore, SessionStore};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::drive::{DriveClient, FetchError};
use crate::retry::{RetryPolicy, retry_with_backoff};

/// Storage key prefix for session records.
const SESSION_KEY_PREFIX: &str = "gallery_auth_";

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    /// Access granted under the given scope.
    Granted(Scope),
    /// Access denied; the reason maps to an actionable next step.
    Denied(DenyReason),
}

/// Why access was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The folder is protected and no session exists; the caller should run
    /// the password entry flow.
    AuthenticationRequired,
    /// A stored session does not belong to this folder.
    InvalidSession,
    /// The session outlived its TTL and was evicted.
    Expired,
}

/// Outcome of a password submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordOutcome {
    /// The submission was accepted and a session was issued.
    Accepted(Scope),
    /// The candidate did not match; no session was created or altered.
    Incorrect,
}

/// Validates and remembers per-folder authorization decisions.
pub struct SessionAuthCache {
    client: Arc<DriveClient>,
    store: Arc<dyn SessionStore>,
    policy: RetryPolicy,
}

impl SessionAuthCache {
    /// Creates a cache over the given client and session store.
    #[must_use]
    pub fn new(client: Arc<DriveClient>, store: Arc<dyn SessionStore>, policy: RetryPolicy) -> Self {
        Self {
            client,
            store,
            policy,
        }
    }

    fn key(folder_id: &str) -> String {
        format!("{SESSION_KEY_PREFIX}{folder_id}")
    }

    fn load_session(&self, folder_id: &str) -> Option<AuthSession> {
        let raw = self.store.get(&Self::key(folder_id))?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(err) => {
                // An undecodable record cannot be trusted; drop it and
                // re-derive access from scratch.
                warn!(folder_id, error = %err, "evicting undecodable session record");
                self.store.remove(&Self::key(folder_id));
                None
            }
        }
    }

    fn save_session(&self, session: &AuthSession) {
        match serde_json::to_string(session) {
            Ok(raw) => self.store.set(&Self::key(&session.folder_id), raw),
            Err(err) => {
                warn!(folder_id = %session.folder_id, error = %err, "failed to serialize session record");
            }
        }
    }

    /// Authorizes access to `folder_id` as of the current instant.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the protection-marker probe fails after
    /// retries. Denials are values, not errors.
    pub async fn authorize(&self, folder_id: &str) -> Result<Authorization, FetchError> {
        self.authorize_at(folder_id, Utc::now()).await
    }

    /// Authorizes access, evaluating session TTLs against an explicit `now`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the protection-marker probe fails after
    /// retries.
    #[instrument(skip(self, now))]
    pub async fn authorize_at(
        &self,
        folder_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Authorization, FetchError> {
        let Some(session) = self.load_session(folder_id) else {
            let marker =
                markers::find_password_marker(&self.client, &self.policy, folder_id).await?;
            if marker.is_some() {
                debug!(folder_id, "protected folder without session");
                return Ok(Authorization::Denied(DenyReason::AuthenticationRequired));
            }
            let session = AuthSession::new(folder_id, Scope::Public, now);
            self.save_session(&session);
            info!(folder_id, "synthesized public session for unprotected folder");
            return Ok(Authorization::Granted(Scope::Public));
        };

        // Records are keyed by folder id; one carrying a different id was
        // stored under the wrong key and authorizes nothing here.
        if session.folder_id != folder_id {
            warn!(folder_id, session_folder = %session.folder_id, "session folder mismatch");
            return Ok(Authorization::Denied(DenyReason::InvalidSession));
        }

        match session.scope {
            Scope::Public => Ok(Authorization::Granted(Scope::Public)),
            Scope::Authenticated if session.is_expired(now) => {
                self.store.remove(&Self::key(folder_id));
                debug!(folder_id, "session expired, evicted");
                Ok(Authorization::Denied(DenyReason::Expired))
            }
            Scope::Authenticated => Ok(Authorization::Granted(Scope::Authenticated)),
        }
    }

    /// Submits a password for `folder_id` as of the current instant.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the marker lookup or secret fetch fails
    /// after retries. A wrong password is a value, not an error.
    pub async fn submit_password(
        &self,
        folder_id: &str,
        candidate: &str,
    ) -> Result<PasswordOutcome, FetchError> {
        self.submit_password_at(folder_id, candidate, Utc::now())
            .await
    }

    /// Submits a password, stamping any issued session with `now`.
    ///
    /// The candidate and the stored secret are both normalized by
    /// [`normalize_secret`] before comparison. On mismatch no session is
    /// created or altered.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the marker lookup or secret fetch fails
    /// after retries.
    #[instrument(skip(self, candidate, now))]
    pub async fn submit_password_at(
        &self,
        folder_id: &str,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<PasswordOutcome, FetchError> {
        let marker = markers::find_password_marker(&self.client, &self.policy, folder_id).await?;
        let Some(marker) = marker else {
            // The folder turned out to be unprotected; treat the visit like
            // any other public one.
            let session = AuthSession::new(folder_id, Scope::Public, now);
            self.save_session(&session);
            return Ok(PasswordOutcome::Accepted(Scope::Public));
        };

        let secret = retry_with_backoff(&self.policy, || {
            let client = Arc::clone(&self.client);
            let id = marker.id.clone();
            async move { client.fetch_text(&id).await }
        })
        .await?;

        if normalize_secret(candidate) == normalize_secret(&secret) {
            let session = AuthSession::new(folder_id, Scope::Authenticated, now);
            self.save_session(&session);
            info!(folder_id, "password accepted, authenticated session issued");
            Ok(PasswordOutcome::Accepted(Scope::Authenticated))
        } else {
            debug!(folder_id, "password rejected");
            Ok(PasswordOutcome::Incorrect)
        }
    }

    /// Whether bulk download is enabled for `folder_id`.
    ///
    /// Evaluated independently of the password gate.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the marker lookup or content fetch fails
    /// after retries.
    pub async fn download_enabled(&self, folder_id: &str) -> Result<bool, FetchError> {
        markers::download_enabled(&self.client, &self.policy, folder_id).await
    }
}
