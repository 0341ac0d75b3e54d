//! On-disk persistence of the current session, the CLI's stand-in for browser session storage.

use crate::model::Session;
use crate::{utils, Result};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads and writes `session.json`. The file only exists while the user is signed in.
#[derive(Debug, Clone)]
pub(crate) struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored session, or `None` when there is no session file.
    pub(crate) async fn load(&self) -> Result<Option<Session>> {
        if !self.path.is_file() {
            return Ok(None);
        }
        let session: Session = utils::deserialize(&self.path)
            .await
            .context("Unable to deserialize the session JSON file")?;
        Ok(Some(session))
    }

    /// Saves `session`, readable only by the current user.
    pub(crate) async fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            utils::make_dir(parent).await?;
        }
        let json =
            serde_json::to_string_pretty(session).context("Failed to serialize the session")?;
        utils::write(&self.path, json).await?;

        // Set restrictive permissions on Unix-like systems
        #[cfg(unix)]
        {
            use std::fs::Permissions;
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, Permissions::from_mode(0o600))
                .context("Failed to set file permissions")?;
        }

        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    pub(crate) async fn clear(&self) -> Result<()> {
        utils::remove(&self.path).await
    }
}
