/// Common test utilities and helpers for repowatch tests

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use repowatch::config::{EmailConfig, GitHubConfig};
use repowatch::{Config, Mailer, Message, StateStore, TrackedState};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Temporary state directory plus a mock GitHub API
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub server: MockServer,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let server = MockServer::start().await;

        Self { temp_dir, server }
    }

    pub fn state_file(&self) -> PathBuf {
        self.temp_dir.path().join("tracked_repos.json")
    }

    pub fn config(&self, users: &[&str]) -> Config {
        Config {
            users: users.iter().map(|u| u.to_string()).collect(),
            github: GitHubConfig {
                api_url: self.server.uri(),
                token: None,
                timeout: Duration::from_secs(5),
            },
            email: EmailConfig {
                sender: Some("bot@example.com".to_string()),
                password: Some("secret".to_string()),
                receiver: Some("me@example.com".to_string()),
                smtp_server: Some("smtp.example.com".to_string()),
                smtp_port: 465,
            },
            state_file: self.state_file(),
        }
    }

    /// Serve a repository listing for a user
    pub async fn serve_repos(&self, user: &str, repos: &[&str]) {
        let body: Vec<_> = repos
            .iter()
            .enumerate()
            .map(|(id, name)| {
                json!({
                    "id": id,
                    "name": name,
                    "full_name": format!("{}/{}", user, name),
                    "private": false,
                    "fork": false
                })
            })
            .collect();

        Mock::given(method("GET"))
            .and(path(format!("/users/{}/repos", user)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Make the listing for a user fail with the given status
    pub async fn fail_repos(&self, user: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/users/{}/repos", user)))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    pub fn seed_state(&self, users: &[(&str, &[&str])]) {
        let state = TrackedState::from_users(
            users
                .iter()
                .map(|(user, repos)| (*user, repos.to_vec())),
        )
        .expect("Invalid seed state");

        StateStore::new(self.state_file())
            .save(&state)
            .expect("Failed to seed state");
    }

    pub fn saved_state(&self) -> TrackedState {
        StateStore::new(self.state_file())
            .load()
            .expect("Failed to load saved state")
    }
}

/// Mailer that records messages instead of sending them
#[derive(Default)]
pub struct FakeMailer {
    pub sent: Mutex<Vec<Message>>,
    pub fail: bool,
}

impl FakeMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().expect("Mailer lock poisoned").clone()
    }
}

#[async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        if self.fail {
            return Err(anyhow!("SMTP server unavailable"));
        }
        self.sent
            .lock()
            .expect("Mailer lock poisoned")
            .push(message.clone());
        Ok(())
    }
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}
