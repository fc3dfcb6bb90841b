use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::GitHubConfig;

/// Largest page size the listing endpoint accepts. Only the first page is read.
const PER_PAGE: &str = "100";

/// Anything that can list a user's public repository names
#[async_trait]
pub trait RepoSource: Send + Sync {
    async fn list_repo_names(&self, username: &str) -> Result<Vec<String>>;
}

/// The listing endpoint returns full repository objects; only the name matters here
#[derive(Debug, Deserialize)]
struct RepoListing {
    name: String,
}

/// GitHub REST client for public repository listings
pub struct GitHubClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a new client. A token is optional; anonymous requests get a lower rate limit.
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("repowatch/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client")?;

        match &config.token {
            Some(token) => {
                if !token.starts_with("ghp_")
                    && !token.starts_with("gho_")
                    && !token.starts_with("ghs_")
                    && !token.starts_with("github_pat_")
                {
                    warn!("GITHUB_TOKEN doesn't look like a valid GitHub token");
                }
                debug!("Using token authentication for GitHub API");
            }
            None => info!("No GITHUB_TOKEN set, using unauthenticated GitHub API access"),
        }

        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn repos_url(&self, username: &str) -> String {
        format!("{}/users/{}/repos", self.api_url, username)
    }
}

#[async_trait]
impl RepoSource for GitHubClient {
    async fn list_repo_names(&self, username: &str) -> Result<Vec<String>> {
        debug!("Fetching public repositories for: {}", username);

        let mut request = self
            .http
            .get(self.repos_url(username))
            .query(&[("per_page", PER_PAGE)])
            .header(ACCEPT, "application/vnd.github+json");

        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("token {}", token));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("Failed to request repositories for {}", username))?
            .error_for_status()
            .with_context(|| format!("GitHub rejected repository listing for {}", username))?;

        let repos: Vec<RepoListing> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse repository listing for {}", username))?;

        let names: Vec<String> = repos.into_iter().map(|repo| repo.name).collect();

        debug!("Found {} repositories for {}", names.len(), username);
        Ok(names)
    }
}

/// Fetch a user's repositories, treating any failure as an empty listing.
///
/// The error is logged and the run carries on with the next user. Callers cannot
/// tell a failed fetch from a user with no public repositories.
pub async fn fetch_or_empty(source: &dyn RepoSource, username: &str) -> Vec<String> {
    match source.list_repo_names(username).await {
        Ok(names) => names,
        Err(e) => {
            warn!("Error fetching repositories for {}: {:#}", username, e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> GitHubClient {
        GitHubClient::new(&GitHubConfig {
            api_url: server.uri(),
            token: token.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .expect("Failed to create client")
    }

    #[tokio::test]
    async fn test_lists_repository_names_in_api_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/alice/repos"))
            .and(query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "zeta", "id": 1, "fork": false},
                {"name": "alpha", "id": 2, "private": false}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let names = client.list_repo_names("alice").await.expect("Failed to list");

        assert_eq!(names, vec!["zeta", "alpha"]);
        assert!(!client.is_authenticated());
    }

    #[tokio::test]
    async fn test_sends_token_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/bob/repos"))
            .and(header("authorization", "token ghp_abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("ghp_abc"));
        let names = client.list_repo_names("bob").await.expect("Failed to list");

        assert!(names.is_empty());
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn test_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/carol/repos"))
            .respond_with(ResponseTemplate::new(403).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(client.list_repo_names("carol").await.is_err());
    }

    #[tokio::test]
    async fn test_unexpected_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/dave/repos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(client.list_repo_names("dave").await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_or_empty_swallows_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/carol/repos"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        assert!(fetch_or_empty(&client, "carol").await.is_empty());
    }

    #[test]
    fn test_trailing_slash_in_api_url() {
        let client = GitHubClient::new(&GitHubConfig {
            api_url: "https://api.example.com/".to_string(),
            token: None,
            timeout: Duration::from_secs(5),
        })
        .expect("Failed to create client");

        assert_eq!(
            client.repos_url("alice"),
            "https://api.example.com/users/alice/repos"
        );
    }
}
