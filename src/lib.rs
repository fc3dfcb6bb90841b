//! repowatch - New Repository Notifications for GitHub Users
//!
//! repowatch checks a list of GitHub users for public repositories it has not seen
//! before and emails a summary. Each invocation is one pass; run it from cron or a
//! systemd timer.
//!
//! ## Modules
//!
//! - [`config`]: Run configuration from flags and environment
//! - [`github`]: Public repository listings from the GitHub API
//! - [`state`]: Persisted record of already-reported repositories
//! - [`diff`]: New-repository detection
//! - [`notify`]: Email formatting and delivery
//! - [`watcher`]: One fetch, diff, persist, notify pass

pub mod config;
pub mod diff;
pub mod github;
pub mod notify;
pub mod state;
pub mod watcher;

pub use config::{Config, ConfigArgs};
pub use diff::{new_repos, NewReposSummary, UserRepos};
pub use github::{fetch_or_empty, GitHubClient, RepoSource};
pub use notify::{compose, Mailer, Message, SmtpMailer};
pub use state::{StateError, StateStore, TrackedState};
pub use watcher::{RunReport, Watcher};
