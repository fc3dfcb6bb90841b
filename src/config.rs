use clap::Args;
use dirs::data_dir;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Public GitHub REST endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default HTTP timeout for repository listing requests, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Raw configuration surface. Every flag falls back to an environment variable,
/// so a cron job can drive the whole run from a `.env` file.
#[derive(Debug, Args, Clone)]
pub struct ConfigArgs {
    /// Comma-separated list of GitHub usernames to watch
    #[arg(long = "users", env = "USER_LIST")]
    pub users: Option<String>,

    /// GitHub personal access token (optional, raises the rate limit)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub github_api_url: String,

    /// Address the notification is sent from (also the SMTP login)
    #[arg(long, env = "EMAIL_SENDER")]
    pub email_sender: Option<String>,

    /// SMTP password or app-specific authorization code
    #[arg(long, env = "EMAIL_PASSWORD", hide_env_values = true)]
    pub email_password: Option<String>,

    /// Address the notification is sent to
    #[arg(long, env = "EMAIL_RECEIVER")]
    pub email_receiver: Option<String>,

    /// SMTP relay host (implicit TLS)
    #[arg(long, env = "SMTP_SERVER")]
    pub smtp_server: Option<String>,

    /// SMTP relay port
    #[arg(long, env = "SMTP_PORT")]
    pub smtp_port: u16,

    /// File holding the repositories already reported
    /// (defaults to the XDG data directory)
    #[arg(long, env = "TRACKED_REPOS_FILE")]
    pub state_file: Option<String>,

    /// Timeout for each GitHub request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the user data directory; set TRACKED_REPOS_FILE")]
    NoDataDir,

    #[error("Failed to expand state file path {path:?}")]
    PathExpansion {
        path: String,
        #[source]
        source: shellexpand::LookupError<std::env::VarError>,
    },
}

/// Immutable run configuration, built once at startup and passed by reference
#[derive(Clone)]
pub struct Config {
    /// Users to watch, in the order they are checked and reported
    pub users: Vec<String>,

    pub github: GitHubConfig,

    pub email: EmailConfig,

    /// Tracked-state file location (already expanded)
    pub state_file: PathBuf,
}

/// GitHub API settings
#[derive(Clone)]
pub struct GitHubConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

/// Outgoing mail settings. Missing values are reported when a message is sent,
/// not at startup.
#[derive(Clone)]
pub struct EmailConfig {
    pub sender: Option<String>,
    pub password: Option<String>,
    pub receiver: Option<String>,
    pub smtp_server: Option<String>,
    pub smtp_port: u16,
}

impl Config {
    /// Build the run configuration from parsed flags and environment
    pub fn from_args(args: ConfigArgs) -> Result<Self, ConfigError> {
        let state_file = match args.state_file {
            Some(path) => expand_path(&path)?,
            None => default_state_file()?,
        };

        Ok(Self {
            users: parse_user_list(args.users.as_deref().unwrap_or_default()),
            github: GitHubConfig {
                api_url: args.github_api_url,
                token: args.github_token.filter(|t| !t.is_empty()),
                timeout: Duration::from_secs(args.http_timeout),
            },
            email: EmailConfig {
                sender: args.email_sender,
                password: args.email_password,
                receiver: args.email_receiver,
                smtp_server: args.smtp_server,
                smtp_port: args.smtp_port,
            },
            state_file,
        })
    }
}

/// Split a comma-separated user list, trimming entries and dropping blanks
pub fn parse_user_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|user| !user.is_empty())
        .map(str::to_string)
        .collect()
}

/// Default tracked-state location (XDG compliant)
pub fn default_state_file() -> Result<PathBuf, ConfigError> {
    let data_dir = data_dir().ok_or(ConfigError::NoDataDir)?;

    Ok(data_dir.join("repowatch").join("tracked_repos.json"))
}

fn expand_path(path: &str) -> Result<PathBuf, ConfigError> {
    let expanded = shellexpand::full(path).map_err(|source| ConfigError::PathExpansion {
        path: path.to_string(),
        source,
    })?;

    Ok(PathBuf::from(expanded.as_ref()))
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "<redacted>"
    } else {
        "<unset>"
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("users", &self.users)
            .field("github", &self.github)
            .field("email", &self.email)
            .field("state_file", &self.state_file)
            .finish()
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_url", &self.api_url)
            .field("token", &redact(&self.token))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("sender", &self.sender)
            .field("password", &redact(&self.password))
            .field("receiver", &self.receiver)
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}
