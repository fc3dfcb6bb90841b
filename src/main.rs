use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use repowatch::{Config, ConfigArgs, GitHubClient, SmtpMailer, StateStore, Watcher};

#[derive(Parser)]
#[command(name = "repowatch")]
#[command(about = "Email a summary when watched GitHub users create new repositories")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check all watched users once and email anything new (default)
    Check {
        /// Fetch and compare only; do not save state or send email
        #[arg(long)]
        dry_run: bool,
    },

    /// Show the repositories already recorded for each user
    Tracked,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let config = Config::from_args(cli.config)?;

    match cli.command {
        None => cmd_check(false, &config).await,
        Some(Commands::Check { dry_run }) => cmd_check(dry_run, &config).await,
        Some(Commands::Tracked) => cmd_tracked(&config),
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

/// Run one watch pass
async fn cmd_check(dry_run: bool, config: &Config) -> Result<()> {
    info!(
        "Starting repowatch v{} for {} users",
        env!("CARGO_PKG_VERSION"),
        config.users.len()
    );

    let github_client = GitHubClient::new(&config.github)?;
    let mailer = SmtpMailer::new(&config.email);

    let report = Watcher::new(config, &github_client, &mailer)
        .dry_run(dry_run)
        .run()
        .await?;

    info!(
        "Checked {} users in {:.2}s: {} new repositories from {} users",
        report.users_checked,
        report.duration.as_secs_f64(),
        report.summary.total_repos(),
        report.summary.len()
    );

    Ok(())
}

/// Print the tracked state
fn cmd_tracked(config: &Config) -> Result<()> {
    let store = StateStore::new(config.state_file.clone());
    let state = store.load()?;

    println!("Tracked repositories ({}):", store.path().display());

    if state.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    for (user, repos) in state.users() {
        println!("{} ({}):", user, repos.len());
        for repo in repos {
            println!("  📁 {}", repo);
        }
    }

    Ok(())
}
