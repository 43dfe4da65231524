//! ncfu ("no candy for u").
//!
//! Two halves of one small system:
//!
//! | Part | Description |
//! |------|-------------|
//! | [`job`] | Polls the work service with a fixed retry budget and emails a report |
//! | [`server`] | The work service: moves forgotten in-progress Jira issues back to todo |
//!
//! The job talks to the outside world only through the [`client::HttpClient`]
//! and [`mailer::Mailer`] traits; the service only through
//! [`server::IssueTracker`].

pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod mailer;
pub mod model;
pub mod report;
pub mod server;

pub use config::{JobConfig, MailConfig, ServerConfig};
pub use error::{Error, Result};
pub use job::{ActivationOutcome, PollNotifyJob};
