//! The poll-notify job.
//!
//! `activate` consumes the `work` resource, retrying with a fixed backoff,
//! and emails a report when issues were left behind or when every attempt
//! failed. `warm` pings the service so it does not idle.

use std::sync::Arc;

use crate::client::{HttpClient, ReqwestClient};
use crate::config::JobConfig;
use crate::error::{FetchError, MailError};
use crate::mailer::Mailer;
use crate::model::{FailureRecord, LeftBehindIssue, PollResult};
use crate::report::Report;

/// Resource that performs the sweep and reports what it moved.
pub const WORK_RESOURCE: &str = "work";
/// Keep-alive resource.
pub const PING_RESOURCE: &str = "ping";

/// What a call to [`PollNotifyJob::activate`] ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The service answered and nothing was left behind. No email.
    Clean,
    /// Issues were left behind; an "ok" report was sent.
    Reported { issues: Vec<LeftBehindIssue> },
    /// Every attempt failed; an "error" report was sent.
    Exhausted { failures: Vec<FailureRecord> },
}

pub struct PollNotifyJob {
    config: JobConfig,
    client: Arc<dyn HttpClient>,
    mailer: Arc<dyn Mailer>,
}

impl PollNotifyJob {
    pub fn new(config: JobConfig, client: Arc<dyn HttpClient>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config,
            client,
            mailer,
        }
    }

    /// Wire the job to the reqwest client and the mailer `config` selects.
    pub fn from_config(config: JobConfig, dry_run: bool) -> crate::Result<Self> {
        let client = Arc::new(ReqwestClient::new(config.http_timeout)?);
        let mailer: Arc<dyn Mailer> = Arc::from(crate::mailer::from_config(&config.mail, dry_run)?);
        Ok(Self::new(config, client, mailer))
    }

    /// Poll `work` up to `max_attempts` times and report the result by email.
    ///
    /// Sends at most one email. Delivery failures are logged, never returned.
    pub async fn activate(&self) -> ActivationOutcome {
        let max_attempts = self.config.max_attempts;
        let mut failures: Vec<FailureRecord> = Vec::new();

        for attempt in 1..=max_attempts {
            tracing::debug!(attempt, max_attempts, "Polling work resource");

            match self.poll().await {
                Ok(result) if result.forgot => {
                    tracing::info!(
                        attempt,
                        issues = result.left_behind.len(),
                        "Issues were left behind, sending report"
                    );
                    self.notify_logged(Report::LeftBehind(&result.left_behind))
                        .await;
                    return ActivationOutcome::Reported {
                        issues: result.left_behind,
                    };
                }
                Ok(_) => {
                    tracing::info!(attempt, "Nothing left behind");
                    return ActivationOutcome::Clean;
                }
                Err(err) => {
                    tracing::warn!(attempt, max_attempts, error = %err, "Poll attempt failed");
                    failures.push(FailureRecord {
                        attempt,
                        message: err.to_string(),
                        line: err.line(),
                    });

                    if attempt < max_attempts {
                        tracing::debug!(
                            backoff_secs = self.config.backoff.as_secs(),
                            "Waiting before next attempt"
                        );
                        tokio::time::sleep(self.config.backoff).await;
                    }
                }
            }
        }

        tracing::error!(
            attempts = failures.len(),
            "All poll attempts failed, sending error report"
        );
        self.notify_logged(Report::Failures(&failures)).await;
        ActivationOutcome::Exhausted { failures }
    }

    /// Ping the service once. Never fails; errors are only logged.
    pub async fn warm(&self) {
        match self.consume(PING_RESOURCE).await {
            Ok(_) => tracing::debug!("Warm ping delivered"),
            Err(err) => tracing::warn!(error = %err, "Warm ping failed"),
        }
    }

    /// GET `{base_url}/{resource}` and return the raw body.
    pub async fn consume(&self, resource: &str) -> Result<String, FetchError> {
        self.client.get(&self.config.resource_url(resource)).await
    }

    /// Render `report` and mail it to the configured recipient.
    pub async fn notify(&self, report: Report<'_>) -> Result<(), MailError> {
        let html = report.render();
        self.mailer
            .send(&self.config.mail.to, &self.config.mail.subject, &html)
            .await
    }

    async fn notify_logged(&self, report: Report<'_>) {
        if let Err(err) = self.notify(report).await {
            tracing::error!(status = report.status(), error = %err, "Failed to send report");
        }
    }

    async fn poll(&self) -> Result<PollResult, FetchError> {
        let body = self.consume(WORK_RESOURCE).await?;
        Ok(serde_json::from_str(&body)?)
    }
}
