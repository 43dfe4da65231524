//! Jira REST v2 access for the work service.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::JiraConfig;
use crate::error::TrackerError;

/// Page size for issue searches.
const SEARCH_PAGE_SIZE: usize = 50;

/// An issue as returned by a tracker search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedIssue {
    pub key: String,
    pub summary: String,
}

/// The subset of an issue tracker the sweep needs.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// All issues matching `jql`.
    async fn search(&self, jql: &str) -> Result<Vec<TrackedIssue>, TrackerError>;

    /// Move `issue_key` using the transition matching `target`.
    async fn transition(&self, issue_key: &str, target: &str) -> Result<(), TrackerError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPage {
    #[serde(default)]
    total: usize,
    #[serde(default)]
    issues: Vec<SearchIssue>,
}

#[derive(Debug, Deserialize)]
struct SearchIssue {
    key: String,
    fields: SearchFields,
}

#[derive(Debug, Deserialize)]
struct SearchFields {
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct TransitionList {
    transitions: Vec<Transition>,
}

#[derive(Debug, Clone, Deserialize)]
struct Transition {
    id: String,
    name: String,
    to: Option<TransitionTarget>,
}

#[derive(Debug, Clone, Deserialize)]
struct TransitionTarget {
    name: String,
}

/// Find the transition a user means by `target`: its name, its id, or the
/// status it leads to, compared case-insensitively.
fn pick_transition<'a>(transitions: &'a [Transition], target: &str) -> Option<&'a Transition> {
    let target = target.trim();
    transitions
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(target) || t.id == target)
        .or_else(|| {
            transitions.iter().find(|t| {
                t.to
                    .as_ref()
                    .is_some_and(|to| to.name.eq_ignore_ascii_case(target))
            })
        })
}

/// Jira client using basic authentication.
pub struct JiraClient {
    base_url: String,
    username: String,
    password: SecretString,
    client: reqwest::Client,
}

impl JiraClient {
    pub fn try_new(config: &JiraConfig) -> Result<Self, TrackerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url: config.server_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/rest/api/2/{}", self.base_url, path)
    }

    async fn check(resp: reqwest::Response, endpoint: &str) -> Result<reqwest::Response, TrackerError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(TrackerError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn search(&self, jql: &str) -> Result<Vec<TrackedIssue>, TrackerError> {
        let endpoint = self.endpoint("search");
        let mut found: Vec<TrackedIssue> = Vec::new();

        loop {
            let start_at = found.len().to_string();
            let page_size = SEARCH_PAGE_SIZE.to_string();
            let resp = self
                .client
                .get(&endpoint)
                .basic_auth(&self.username, Some(self.password.expose_secret()))
                .query(&[
                    ("jql", jql),
                    ("fields", "summary"),
                    ("startAt", start_at.as_str()),
                    ("maxResults", page_size.as_str()),
                ])
                .send()
                .await?;

            let page: SearchPage = Self::check(resp, &endpoint)
                .await?
                .json()
                .await
                .map_err(|e| TrackerError::Parse(e.to_string()))?;

            let fetched = page.issues.len();
            found.extend(page.issues.into_iter().map(|issue| TrackedIssue {
                key: issue.key,
                summary: issue.fields.summary,
            }));

            if fetched == 0 || found.len() >= page.total {
                break;
            }
        }

        tracing::debug!(jql, count = found.len(), "Jira search complete");
        Ok(found)
    }

    async fn transition(&self, issue_key: &str, target: &str) -> Result<(), TrackerError> {
        let endpoint = self.endpoint(&format!("issue/{issue_key}/transitions"));

        let resp = self
            .client
            .get(&endpoint)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .send()
            .await?;
        let list: TransitionList = Self::check(resp, &endpoint)
            .await?
            .json()
            .await
            .map_err(|e| TrackerError::Parse(e.to_string()))?;

        let transition =
            pick_transition(&list.transitions, target).ok_or_else(|| TrackerError::NoTransition {
                issue: issue_key.to_string(),
                target: target.to_string(),
            })?;

        let resp = self
            .client
            .post(&endpoint)
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .json(&serde_json::json!({ "transition": { "id": transition.id } }))
            .send()
            .await?;
        Self::check(resp, &endpoint).await?;

        tracing::info!(issue = issue_key, transition = %transition.name, "Issue transitioned");
        Ok(())
    }
}
