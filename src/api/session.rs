//! The signed-in session for the hosted backend, kept in `.secrets/session.json`.

use crate::error::Res;
use crate::utils;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Access tokens are refreshed when they are this close to expiring.
const EXPIRY_LEEWAY_SECONDS: i64 = 60;

/// The tokens returned by a password or refresh-token grant.
///
/// Example:
/// ```json
/// {
///   "access_token": "eyJhbGciOi...",
///   "refresh_token": "v1.Mr5...",
///   "expires_at": "2024-05-03T10:15:30Z",
///   "user_id": "1f0c5c0e-8a55-4d1d-9d59-1c2f1e0d7a11"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Session {
    pub(crate) access_token: String,
    pub(crate) refresh_token: String,
    pub(crate) expires_at: DateTime<Utc>,
    pub(crate) user_id: String,
}

impl Session {
    /// Returns true if the access token should be refreshed before it is used at `now`.
    pub(crate) fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_LEEWAY_SECONDS) >= self.expires_at
    }
}

/// A `Session` together with the file it is persisted to.
#[derive(Debug, Clone)]
pub(crate) struct SessionFile {
    path: PathBuf,
    session: Session,
}

impl SessionFile {
    pub(crate) fn new(path: impl Into<PathBuf>, session: Session) -> Self {
        Self {
            path: path.into(),
            session,
        }
    }

    /// Loads the session written by `kakeibo login`.
    pub(crate) async fn load(path: impl Into<PathBuf>) -> Res<Self> {
        let path = path.into();
        let session: Session = utils::deserialize(&path)
            .await
            .context("No saved session, run 'kakeibo login' first")?;
        Ok(Self { path, session })
    }

    /// Writes the session with permissions restricted to the current user.
    pub(crate) async fn save(&self) -> Res<()> {
        let json = serde_json::to_string_pretty(&self.session)
            .context("Failed to serialize session to JSON")?;
        utils::write(&self.path, json).await?;

        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, Permissions::from_mode(0o600))
                .context("Failed to set session file permissions")?;
        }

        Ok(())
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn set_session(&mut self, session: Session) {
        self.session = session;
    }
}
