//! The work service polled by the job.
//!
//! `GET /work` finds the current user's issues still sitting in the
//! in-progress column, moves each back to todo and reports what it moved.
//! `GET /ping` exists so a scheduler can keep the host from idling.

pub mod jira;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::config::JiraConfig;
use crate::error::TrackerError;
use crate::model::{LeftBehindIssue, PollResult};

pub use self::jira::{IssueTracker, JiraClient, TrackedIssue};

/// Which issues to sweep and where to move them.
#[derive(Debug, Clone)]
pub struct Board {
    pub project_id: String,
    /// Status forgotten issues sit in.
    pub origin: String,
    /// Transition (or destination status) to move them with.
    pub target: String,
}

impl Board {
    /// JQL selecting the current user's issues in `origin`.
    pub fn jql(&self) -> String {
        format!(
            "project={} and assignee=currentuser() and status=\"{}\"",
            self.project_id,
            self.origin.replace('\\', "\\\\").replace('"', "\\\"")
        )
    }
}

impl From<&JiraConfig> for Board {
    fn from(config: &JiraConfig) -> Self {
        Self {
            project_id: config.project_id.clone(),
            origin: config.origin.clone(),
            target: config.target.clone(),
        }
    }
}

/// Shared state for the work service.
#[derive(Clone)]
pub struct WorkState {
    pub tracker: Arc<dyn IssueTracker>,
    pub board: Board,
}

impl WorkState {
    /// Search, move every match back, and describe what was moved.
    ///
    /// Stops at the first failed transition.
    pub async fn sweep(&self) -> Result<PollResult, TrackerError> {
        let issues = self.tracker.search(&self.board.jql()).await?;
        if issues.is_empty() {
            return Ok(PollResult::clean());
        }

        let mut left_behind = Vec::with_capacity(issues.len());
        for issue in issues {
            self.tracker
                .transition(&issue.key, &self.board.target)
                .await?;
            left_behind.push(LeftBehindIssue {
                key: issue.key,
                title: issue.summary,
            });
        }

        tracing::info!(moved = left_behind.len(), "Sweep moved forgotten issues");
        Ok(PollResult::forgot(left_behind))
    }
}

/// Build the axum router for the work service.
pub fn router(state: WorkState) -> Router {
    Router::new()
        .route("/work", get(work))
        .route("/ping", get(ping))
        .with_state(state)
}

/// Serve the work service against Jira until the process is stopped.
pub async fn serve(bind: SocketAddr, jira: &JiraConfig) -> crate::Result<()> {
    let state = WorkState {
        tracker: Arc::new(JiraClient::try_new(jira)?),
        board: Board::from(jira),
    };

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("Work service listening on {}", bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn work(State(state): State<WorkState>) -> Response {
    match state.sweep().await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Sweep failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn ping() -> Json<&'static str> {
    Json("pong")
}
