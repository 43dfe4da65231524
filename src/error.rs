//! Error types for ncfu.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Errors from consuming a resource on the work service.
///
/// Every variant is treated as transient by the poll loop.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    #[error("Request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response body at line {line}, column {column}: {reason}")]
    Parse {
        reason: String,
        line: usize,
        column: usize,
    },
}

impl FetchError {
    /// Line in the response body where parsing failed, if this is a parse error.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Parse { line, .. } => Some(*line),
            Self::Client(_) | Self::Transport { .. } | Self::Status { .. } => None,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse {
            reason: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }
}

/// Errors from delivering a notification.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail relay request failed: {0}")]
    Transport(String),

    #[error("Mail relay rejected message with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid mail relay configuration: {0}")]
    InvalidConfig(String),
}

/// Errors from the issue tracker backing the work service.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Tracker request failed: {0}")]
    Request(String),

    #[error("Tracker returned HTTP {status} for {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Issue {issue} has no transition to '{target}'")]
    NoTransition { issue: String, target: String },

    #[error("Unexpected tracker response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}

/// Result type alias for ncfu.
pub type Result<T> = std::result::Result<T, Error>;
