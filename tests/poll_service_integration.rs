//! End-to-end: the poll job against a live work service on loopback.
//!
//! The service runs over a mock issue tracker and the job uses the real
//! reqwest client, so the wire format between the two halves is exercised.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ncfu::client::ReqwestClient;
use ncfu::config::{JobConfig, MailConfig};
use ncfu::error::{MailError, TrackerError};
use ncfu::job::{ActivationOutcome, PollNotifyJob};
use ncfu::mailer::Mailer;
use ncfu::server::{Board, IssueTracker, TrackedIssue, WorkState, router};

struct FixedTracker {
    issues: Vec<TrackedIssue>,
    broken: bool,
}

#[async_trait]
impl IssueTracker for FixedTracker {
    async fn search(&self, _jql: &str) -> Result<Vec<TrackedIssue>, TrackerError> {
        if self.broken {
            return Err(TrackerError::Request("jira unreachable".to_string()));
        }
        Ok(self.issues.clone())
    }

    async fn transition(&self, _issue_key: &str, _target: &str) -> Result<(), TrackerError> {
        Ok(())
    }
}

#[derive(Default)]
struct Inbox {
    messages: Mutex<Vec<String>>,
}

#[async_trait]
impl Mailer for Inbox {
    async fn send(&self, _to: &str, _subject: &str, html_body: &str) -> Result<(), MailError> {
        self.messages.lock().unwrap().push(html_body.to_string());
        Ok(())
    }
}

/// Start the work service on an ephemeral port and return its base URL.
async fn spawn_service(tracker: FixedTracker) -> String {
    let app = router(WorkState {
        tracker: Arc::new(tracker),
        board: Board {
            project_id: "NCFU".to_string(),
            origin: "In Progress".to_string(),
            target: "To Do".to_string(),
        },
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn job(base_url: &str, inbox: Arc<Inbox>) -> PollNotifyJob {
    let mut config = JobConfig::new(base_url, MailConfig::log_only("me@example.com"));
    config.backoff = Duration::from_millis(10);
    let client = Arc::new(ReqwestClient::new(Duration::from_secs(5)).unwrap());
    PollNotifyJob::new(config, client, inbox)
}

#[tokio::test]
async fn forgotten_issues_reach_the_inbox() {
    let base_url = spawn_service(FixedTracker {
        issues: vec![
            TrackedIssue {
                key: "NCFU-1".to_string(),
                summary: "Fix login".to_string(),
            },
            TrackedIssue {
                key: "NCFU-2".to_string(),
                summary: "Write docs".to_string(),
            },
        ],
        broken: false,
    })
    .await;
    let inbox = Arc::new(Inbox::default());

    let outcome = job(&base_url, inbox.clone()).activate().await;

    assert!(matches!(outcome, ActivationOutcome::Reported { ref issues } if issues.len() == 2));
    let messages = inbox.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("<li>(NCFU-1) - Fix login</li>"));
    assert!(messages[0].contains("<li>(NCFU-2) - Write docs</li>"));
}

#[tokio::test]
async fn clean_board_sends_nothing() {
    let base_url = spawn_service(FixedTracker {
        issues: Vec::new(),
        broken: false,
    })
    .await;
    let inbox = Arc::new(Inbox::default());

    let outcome = job(&base_url, inbox.clone()).activate().await;

    assert_eq!(outcome, ActivationOutcome::Clean);
    assert!(inbox.messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn service_errors_exhaust_retries() {
    let base_url = spawn_service(FixedTracker {
        issues: Vec::new(),
        broken: true,
    })
    .await;
    let inbox = Arc::new(Inbox::default());

    let outcome = job(&base_url, inbox.clone()).activate().await;

    let ActivationOutcome::Exhausted { failures } = outcome else {
        panic!("expected Exhausted, got {outcome:?}");
    };
    assert_eq!(failures.len(), 3);
    assert!(failures.iter().all(|f| f.message.contains("HTTP 500")));

    let messages = inbox.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("something went terribly wrong"));
}

#[tokio::test]
async fn warm_hits_ping() {
    let base_url = spawn_service(FixedTracker {
        issues: Vec::new(),
        broken: false,
    })
    .await;
    let inbox = Arc::new(Inbox::default());
    let job = job(&base_url, inbox.clone());

    job.warm().await;
    assert_eq!(job.consume("ping").await.unwrap(), "\"pong\"");
    assert!(inbox.messages.lock().unwrap().is_empty());
}
