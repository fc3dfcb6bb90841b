//! Diff engine - works out which repositories have not been reported yet

use std::collections::HashSet;
use tracing::debug;

use crate::state::TrackedState;

/// Repositories in `current` that are absent from `tracked`, in `current` order
pub fn new_repos(current: &[String], tracked: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = tracked.iter().map(String::as_str).collect();

    current
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

impl TrackedState {
    /// Merge a fresh listing into the user's tracked repositories.
    ///
    /// Unseen users get an entry even when the listing is empty. Returns the names
    /// that were not tracked before, which have now been appended.
    pub fn record(&mut self, user: &str, current: &[String]) -> Vec<String> {
        let tracked = self.entry_mut(user);
        let added = new_repos(current, tracked);

        if !added.is_empty() {
            debug!("{} new repositories for {}: {:?}", added.len(), user, added);
            tracked.extend(added.iter().cloned());
        }

        added
    }
}

/// New repositories for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRepos {
    pub user: String,
    pub repos: Vec<String>,
}

/// New repositories found during a single run, in the order users were checked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewReposSummary {
    entries: Vec<UserRepos>,
}

impl NewReposSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user's new repositories. Users with nothing new are left out.
    pub fn push(&mut self, user: impl Into<String>, repos: Vec<String>) {
        if repos.is_empty() {
            return;
        }

        self.entries.push(UserRepos {
            user: user.into(),
            repos,
        });
    }

    pub fn get(&self, user: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|entry| entry.user == user)
            .map(|entry| entry.repos.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserRepos> {
        self.entries.iter()
    }

    /// Number of users with new repositories
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of new repositories across all users
    pub fn total_repos(&self) -> usize {
        self.entries.iter().map(|entry| entry.repos.len()).sum()
    }
}
