use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::config::project_dirs;

/// An authenticated session handed out by the data platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Keeps the session between CLI invocations.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store in the platform data directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(project_dirs()?.data_dir().join("session.toml")))
    }

    /// Returns the saved session, dropping it if it has expired.
    pub fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;
        let session: Session = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse session file: {}", self.path.display()))?;

        if session.is_expired(Utc::now()) {
            tracing::info!(email = %session.email, "stored session expired");
            self.clear()?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }

        let toml = toml::to_string_pretty(session).context("Failed to serialize session")?;
        fs::write(&self.path, toml)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove session file: {}", self.path.display())
            })?;
        }
        Ok(())
    }
}
