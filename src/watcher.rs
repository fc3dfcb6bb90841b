//! Run orchestration - one pass of fetch, diff, persist, notify
//!
//! A run is a single linear pass; scheduling repeated runs is left to cron or a
//! systemd timer. Users are processed one at a time in configured order.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::Config;
use crate::diff::NewReposSummary;
use crate::github::{fetch_or_empty, RepoSource};
use crate::notify::{compose, notify, Mailer};
use crate::state::{StateStore, TrackedState};

/// Outcome of a single run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub users_checked: usize,
    pub summary: NewReposSummary,
    /// Whether a notification was delivered. False when nothing was new, in dry-run
    /// mode, or when delivery failed.
    pub notified: bool,
    /// Tracked state as of the end of the run
    pub state: TrackedState,
    pub duration: Duration,
}

/// Sequences one watch run over the configured users
pub struct Watcher<'a> {
    users: &'a [String],
    source: &'a dyn RepoSource,
    mailer: &'a dyn Mailer,
    store: StateStore,
    dry_run: bool,
}

impl<'a> Watcher<'a> {
    pub fn new(config: &'a Config, source: &'a dyn RepoSource, mailer: &'a dyn Mailer) -> Self {
        Self {
            users: &config.users,
            source,
            mailer,
            store: StateStore::new(config.state_file.clone()),
            dry_run: false,
        }
    }

    /// Use a different state store than the configured file
    pub fn with_store(mut self, store: StateStore) -> Self {
        self.store = store;
        self
    }

    /// Fetch and diff only: leave the state file alone and log instead of mailing
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one pass. State load and save failures abort the run; fetch and
    /// delivery failures are logged and absorbed.
    pub async fn run(&self) -> Result<RunReport> {
        let start_time = Instant::now();

        let mut state = self
            .store
            .load()
            .context("Failed to load tracked repositories")?;

        let mut summary = NewReposSummary::new();

        for user in self.users {
            info!("Checking repositories for user: {}", user);

            let current = fetch_or_empty(self.source, user).await;
            let added = state.record(user, &current);

            if !added.is_empty() {
                info!("Found {} new repositories for {}", added.len(), user);
            }
            summary.push(user.as_str(), added);
        }

        if self.dry_run {
            info!("Dry run: not saving {}", self.store.path().display());
        } else {
            self.store
                .save(&state)
                .context("Failed to save tracked repositories")?;
        }

        let notified = if summary.is_empty() {
            info!("No new repositories found");
            false
        } else if self.dry_run {
            let message = compose(&summary);
            info!(
                "Dry run: would send \"{}\":\n{}",
                message.subject, message.body
            );
            false
        } else {
            let delivered = notify(self.mailer, &summary).await;
            if !delivered {
                warn!(
                    "{} new repositories were recorded but not delivered",
                    summary.total_repos()
                );
            }
            delivered
        };

        Ok(RunReport {
            users_checked: self.users.len(),
            summary,
            notified,
            state,
            duration: start_time.elapsed(),
        })
    }
}
