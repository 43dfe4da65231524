//! Outbound notification delivery.
//!
//! [`RelayMailer`] hands messages to an HTTP mail relay as JSON, so no SMTP
//! stack is linked in. [`LogMailer`] only logs, and is what runs when no relay
//! is configured or a dry run was requested.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::MailConfig;
use crate::error::MailError;

/// Sends an HTML email.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError>;
}

/// Pick the mailer for the given settings.
pub fn from_config(config: &MailConfig, dry_run: bool) -> Result<Box<dyn Mailer>, MailError> {
    match (&config.relay_url, dry_run) {
        (Some(url), false) => Ok(Box::new(RelayMailer::try_new(
            url.clone(),
            config.relay_token.clone(),
        )?)),
        (None, false) => {
            tracing::warn!("NCFU_MAIL_RELAY_URL not set, notifications will only be logged");
            Ok(Box::new(LogMailer))
        }
        (_, true) => Ok(Box::new(LogMailer)),
    }
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Delivers mail by POSTing it to an HTTP relay.
pub struct RelayMailer {
    url: String,
    token: Option<SecretString>,
    client: reqwest::Client,
}

impl RelayMailer {
    /// Create a relay mailer for `url`, optionally authenticating with a bearer token.
    pub fn try_new(url: impl Into<String>, token: Option<SecretString>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MailError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            token,
            client,
        })
    }
}

#[async_trait]
impl Mailer for RelayMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("User-Agent", concat!("ncfu/", env!("CARGO_PKG_VERSION")))
            .json(&RelayMessage {
                to,
                subject,
                html: html_body,
            });

        if let Some(ref token) = self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let resp = request
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(to, subject, "Notification handed to mail relay");
        Ok(())
    }
}

/// Logs messages instead of sending them.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, html_body: &str) -> Result<(), MailError> {
        tracing::info!(to, subject, body = html_body, "Notification (not delivered)");
        Ok(())
    }
}
