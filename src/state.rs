//! Tracked-state persistence
//!
//! Records, per watched user, the repository names that have already been reported.
//! The state is a single JSON document, read once at the start of a run and fully
//! rewritten at the end:
//!
//! ```json
//! {
//!   "version": 1,
//!   "users": {
//!     "alice": ["repo1", "repo2"]
//!   }
//! }
//! ```
//!
//! Files written by earlier releases are a bare `{"user": [...]}` object; those are
//! accepted and upgraded on the next save.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Current on-disk schema version
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("State file is not valid JSON or has an unexpected shape")]
    Parse(#[from] serde_json::Error),

    #[error("State file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("Repository {repo:?} is listed more than once for user {user:?}")]
    DuplicateRepo { user: String, repo: String },
}

/// Repositories already reported, keyed by username
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedState {
    version: u32,

    #[serde(default)]
    users: BTreeMap<String, Vec<String>>,
}

impl Default for TrackedState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            users: BTreeMap::new(),
        }
    }
}

impl TrackedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from `(user, repos)` pairs, validating uniqueness
    pub fn from_users<I, U, R>(users: I) -> Result<Self, StateError>
    where
        I: IntoIterator<Item = (U, Vec<R>)>,
        U: Into<String>,
        R: Into<String>,
    {
        let users = users
            .into_iter()
            .map(|(user, repos)| (user.into(), repos.into_iter().map(Into::into).collect()))
            .collect();

        let state = Self {
            version: STATE_VERSION,
            users,
        };
        state.validate()?;
        Ok(state)
    }

    /// Parse a state document, accepting both the versioned and the legacy layout
    pub fn from_json(content: &str) -> Result<Self, StateError> {
        let value: Value = serde_json::from_str(content)?;

        let state = match value.get("version") {
            Some(Value::Number(_)) => {
                let state: TrackedState = serde_json::from_value(value)?;
                if state.version > STATE_VERSION {
                    return Err(StateError::UnsupportedVersion {
                        found: state.version,
                        supported: STATE_VERSION,
                    });
                }
                Self {
                    version: STATE_VERSION,
                    users: state.users,
                }
            }
            _ => {
                debug!("Reading legacy state layout");
                Self {
                    version: STATE_VERSION,
                    users: serde_json::from_value(value)?,
                }
            }
        };

        state.validate()?;
        Ok(state)
    }

    pub fn to_json(&self) -> Result<String, StateError> {
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        Ok(content)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Repositories recorded for a user, or `None` if the user was never seen
    pub fn repos(&self, user: &str) -> Option<&[String]> {
        self.users.get(user).map(Vec::as_slice)
    }

    pub fn contains_user(&self, user: &str) -> bool {
        self.users.contains_key(user)
    }

    /// Users and their recorded repositories, sorted by username
    pub fn users(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.users
            .iter()
            .map(|(user, repos)| (user.as_str(), repos.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Mutable access to a user's list, creating an empty one for unseen users
    pub(crate) fn entry_mut(&mut self, user: &str) -> &mut Vec<String> {
        self.users.entry(user.to_string()).or_default()
    }

    fn validate(&self) -> Result<(), StateError> {
        for (user, repos) in &self.users {
            let mut seen = HashSet::with_capacity(repos.len());
            for repo in repos {
                if !seen.insert(repo.as_str()) {
                    return Err(StateError::DuplicateRepo {
                        user: user.clone(),
                        repo: repo.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Reads and writes the tracked-state file.
///
/// Saves overwrite the file in place; there is no temp-file rename or backup, and
/// concurrent runs against the same file are not supported.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the tracked state. A missing file is an empty state; anything unreadable
    /// is an error.
    pub fn load(&self) -> Result<TrackedState> {
        if !self.path.exists() {
            info!(
                "No tracked state at {}, starting fresh",
                self.path.display()
            );
            return Ok(TrackedState::new());
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read state file: {}", self.path.display()))?;

        let state = TrackedState::from_json(&content)
            .with_context(|| format!("Failed to load state file: {}", self.path.display()))?;

        debug!(
            "Loaded tracked state for {} users from {}",
            state.len(),
            self.path.display()
        );
        Ok(state)
    }

    /// Overwrite the state file with the full state
    pub fn save(&self, state: &TrackedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create state directory: {}", parent.display())
                })?;
            }
        }

        let content = state.to_json().context("Failed to serialize tracked state")?;

        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write state file: {}", self.path.display()))?;

        debug!("Saved tracked state to {}", self.path.display());
        Ok(())
    }
}
