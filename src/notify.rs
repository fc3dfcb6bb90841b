//! Notification - formats the new-repository summary and delivers it by email

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::{debug, error, info};

use crate::config::EmailConfig;
use crate::diff::NewReposSummary;

pub const SUBJECT: &str = "GitHub New Repository Notification";

const INTRO: &str = "The following new repositories have been created:";

/// A plain-text notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

/// Anything that can deliver a notification
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &Message) -> Result<()>;
}

/// Canonical web URL of a repository
pub fn repo_url(user: &str, repo: &str) -> String {
    format!("https://github.com/{}/{}", user, repo)
}

/// Format the summary: one block per user, one line per new repository
pub fn compose(summary: &NewReposSummary) -> Message {
    let mut body = format!("{}\n\n", INTRO);

    for entry in summary.iter() {
        body.push_str(&format!(
            "User {} has created the following repositories:\n",
            entry.user
        ));
        for repo in &entry.repos {
            body.push_str(&format!("- {} ({})\n", repo, repo_url(&entry.user, repo)));
        }
        body.push('\n');
    }

    Message {
        subject: SUBJECT.to_string(),
        body,
    }
}

/// Compose and send the summary. Delivery is best-effort: failures are logged and
/// reported through the return value, never propagated.
pub async fn notify(mailer: &dyn Mailer, summary: &NewReposSummary) -> bool {
    let message = compose(summary);

    match mailer.send(&message).await {
        Ok(()) => {
            info!(
                "Notification sent for {} new repositories from {} users",
                summary.total_repos(),
                summary.len()
            );
            true
        }
        Err(e) => {
            error!("Error sending email: {:#}", e);
            false
        }
    }
}

/// SMTP delivery over an implicitly encrypted (SMTPS) connection
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: &EmailConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn sender(&self) -> Result<&str> {
        self.config
            .sender
            .as_deref()
            .ok_or_else(|| anyhow!("EMAIL_SENDER is not set"))
    }

    fn build_email(&self, message: &Message) -> Result<lettre::Message> {
        let from: Mailbox = self
            .sender()?
            .parse()
            .context("Invalid sender address")?;

        let to: Mailbox = self
            .config
            .receiver
            .as_deref()
            .ok_or_else(|| anyhow!("EMAIL_RECEIVER is not set"))?
            .parse()
            .context("Invalid receiver address")?;

        lettre::Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .context("Failed to build email")
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self
            .config
            .smtp_server
            .as_deref()
            .ok_or_else(|| anyhow!("SMTP_SERVER is not set"))?;

        let password = self
            .config
            .password
            .clone()
            .ok_or_else(|| anyhow!("EMAIL_PASSWORD is not set"))?;

        let credentials = Credentials::new(self.sender()?.to_string(), password);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .with_context(|| format!("Failed to set up TLS for SMTP server {}", host))?
            .port(self.config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(transport)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &Message) -> Result<()> {
        let email = self.build_email(message)?;
        let transport = self.transport()?;

        debug!(
            "Sending notification via {}:{}",
            self.config.smtp_server.as_deref().unwrap_or_default(),
            self.config.smtp_port
        );

        transport
            .send(email)
            .await
            .context("SMTP delivery failed")?;

        info!("Email sent successfully!");
        Ok(())
    }
}
