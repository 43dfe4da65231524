//! Configuration for ncfu.
//!
//! Everything is read from environment variables. A `.env` file in the
//! working directory is loaded first if present. Empty values count as unset.

use std::net::SocketAddr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Subject used when `NCFU_MAIL_SUBJECT` is not set.
pub const DEFAULT_SUBJECT: &str = "NCFU Report";

/// Settings for the poll-notify job (`activate` and `warm`).
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Base URL of the work service, without a trailing slash.
    pub base_url: String,
    /// Attempts at consuming `work` before giving up (at least 1).
    pub max_attempts: u32,
    /// Pause between failed attempts.
    pub backoff: Duration,
    /// Per-request timeout for the HTTP client.
    pub http_timeout: Duration,
    pub mail: MailConfig,
}

impl JobConfig {
    /// Load job configuration from environment variables.
    ///
    /// With `dry_run` set no recipient is required, since nothing is delivered.
    pub fn from_env(dry_run: bool) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let base_url = required_env("NCFU_BASE_URL")?;
        let base_url = validate_http_url("NCFU_BASE_URL", &base_url)?;

        let max_attempts: u32 = parse_optional_env("NCFU_MAX_ATTEMPTS", 3)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "NCFU_MAX_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            base_url,
            max_attempts,
            backoff: Duration::from_secs(parse_optional_env("NCFU_BACKOFF_SECS", 30)?),
            http_timeout: Duration::from_secs(parse_optional_env("NCFU_HTTP_TIMEOUT_SECS", 30)?),
            mail: MailConfig::from_env(dry_run)?,
        })
    }

    /// Build a config for the given service URL with default retry settings.
    pub fn new(base_url: impl Into<String>, mail: MailConfig) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_attempts: 3,
            backoff: Duration::from_secs(30),
            http_timeout: Duration::from_secs(30),
            mail,
        }
    }

    /// Full URL of a named resource on the work service.
    pub fn resource_url(&self, resource: &str) -> String {
        format!("{}/{}", self.base_url, resource.trim_start_matches('/'))
    }
}

/// Where and how notifications are delivered.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub to: String,
    pub subject: String,
    /// HTTP mail relay endpoint. `None` means notifications are only logged.
    pub relay_url: Option<String>,
    /// Bearer token for the relay.
    pub relay_token: Option<SecretString>,
}

impl MailConfig {
    fn from_env(dry_run: bool) -> Result<Self, ConfigError> {
        let to = if dry_run {
            optional_env("NCFU_MAIL_TO")?.unwrap_or_default()
        } else {
            required_env("NCFU_MAIL_TO")?
        };

        let relay_url = optional_env("NCFU_MAIL_RELAY_URL")?
            .map(|url| validate_http_url("NCFU_MAIL_RELAY_URL", &url))
            .transpose()?;

        Ok(Self {
            to,
            subject: optional_env("NCFU_MAIL_SUBJECT")?
                .unwrap_or_else(|| DEFAULT_SUBJECT.to_string()),
            relay_url,
            relay_token: optional_env("NCFU_MAIL_RELAY_TOKEN")?.map(SecretString::from),
        })
    }

    /// Log-only mail settings for the given recipient.
    pub fn log_only(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: DEFAULT_SUBJECT.to_string(),
            relay_url: None,
            relay_token: None,
        }
    }
}

/// Settings for the work service (`serve`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub jira: JiraConfig,
}

impl ServerConfig {
    /// Load server configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let bind = optional_env("NCFU_BIND")?
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue {
                key: "NCFU_BIND".to_string(),
                message: format!("must be a socket address: {e}"),
            })?;

        Ok(Self {
            bind,
            jira: JiraConfig::from_env()?,
        })
    }
}

/// Jira connection and board settings.
#[derive(Debug, Clone)]
pub struct JiraConfig {
    pub server_url: String,
    pub username: String,
    pub password: SecretString,
    /// Status the forgotten issues sit in ("in progress").
    pub origin: String,
    /// Transition or status they are moved to ("todo").
    pub target: String,
    pub project_id: String,
}

impl JiraConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let server_url = required_env("JIRA_SERVER_URL")?;
        Ok(Self {
            server_url: validate_http_url("JIRA_SERVER_URL", &server_url)?,
            username: required_env("JIRA_USERNAME")?,
            password: SecretString::from(required_env("JIRA_PASSWORD")?),
            origin: required_env("JIRA_IN_PROGRESS_COLUMN")?,
            target: required_env("JIRA_TODO_COLUMN")?,
            project_id: required_env("JIRA_PROJECT_ID")?,
        })
    }

    /// Get the Jira password (exposes the secret).
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Only `http` and `https` are accepted. Returns the URL without a trailing slash.
fn validate_http_url(key: &str, raw: &str) -> Result<String, ConfigError> {
    let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("invalid URL '{raw}': {e}"),
    })?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("scheme '{}' not allowed; use http or https", parsed.scheme()),
        });
    }

    Ok(raw.trim_end_matches('/').to_string())
}

pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!(
            "failed to read {key}: {e}"
        ))),
    }
}

pub(crate) fn required_env(key: &str) -> Result<String, ConfigError> {
    optional_env(key)?.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

pub(crate) fn parse_optional_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    optional_env(key)?
        .map(|s| {
            s.parse().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            })
        })
        .transpose()
        .map(|opt| opt.unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global, so serialize tests that mutate them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const JOB_VARS: &[&str] = &[
        "NCFU_BASE_URL",
        "NCFU_MAX_ATTEMPTS",
        "NCFU_BACKOFF_SECS",
        "NCFU_HTTP_TIMEOUT_SECS",
        "NCFU_MAIL_TO",
        "NCFU_MAIL_SUBJECT",
        "NCFU_MAIL_RELAY_URL",
        "NCFU_MAIL_RELAY_TOKEN",
    ];

    fn clear_job_vars() {
        for key in JOB_VARS {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn optional_env_returns_none_for_empty_string() {
        let _lock = ENV_LOCK.lock();
        unsafe { std::env::set_var("_TEST_NCFU_EMPTY_42", "") };
        let result = optional_env("_TEST_NCFU_EMPTY_42").unwrap();
        assert!(result.is_none());
        unsafe { std::env::remove_var("_TEST_NCFU_EMPTY_42") };
    }

    #[test]
    fn parse_optional_env_returns_error_for_invalid_value() {
        let _lock = ENV_LOCK.lock();
        unsafe { std::env::set_var("_TEST_NCFU_PARSE_BAD_42", "soon") };
        let result: Result<u64, _> = parse_optional_env("_TEST_NCFU_PARSE_BAD_42", 0);
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
        unsafe { std::env::remove_var("_TEST_NCFU_PARSE_BAD_42") };
    }

    #[test]
    fn job_config_defaults() {
        let _lock = ENV_LOCK.lock();
        clear_job_vars();
        unsafe {
            std::env::set_var("NCFU_BASE_URL", "https://ncfu.example.com/");
            std::env::set_var("NCFU_MAIL_TO", "me@example.com");
        }

        let config = JobConfig::from_env(false).unwrap();
        assert_eq!(config.base_url, "https://ncfu.example.com");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff, Duration::from_secs(30));
        assert_eq!(config.mail.to, "me@example.com");
        assert_eq!(config.mail.subject, DEFAULT_SUBJECT);
        assert!(config.mail.relay_url.is_none());
        assert_eq!(config.resource_url("work"), "https://ncfu.example.com/work");

        clear_job_vars();
    }

    #[test]
    fn job_config_requires_recipient_unless_dry_run() {
        let _lock = ENV_LOCK.lock();
        clear_job_vars();
        unsafe { std::env::set_var("NCFU_BASE_URL", "https://ncfu.example.com") };

        let err = JobConfig::from_env(false).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref key) if key == "NCFU_MAIL_TO"));

        let config = JobConfig::from_env(true).unwrap();
        assert!(config.mail.to.is_empty());

        clear_job_vars();
    }

    #[test]
    fn job_config_rejects_zero_attempts_and_bad_scheme() {
        let _lock = ENV_LOCK.lock();
        clear_job_vars();
        unsafe {
            std::env::set_var("NCFU_BASE_URL", "https://ncfu.example.com");
            std::env::set_var("NCFU_MAX_ATTEMPTS", "0");
        }
        let err = JobConfig::from_env(true).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "NCFU_MAX_ATTEMPTS"));

        unsafe {
            std::env::remove_var("NCFU_MAX_ATTEMPTS");
            std::env::set_var("NCFU_BASE_URL", "ftp://ncfu.example.com");
        }
        let err = JobConfig::from_env(true).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "NCFU_BASE_URL"));

        clear_job_vars();
    }

    #[test]
    fn resource_url_joins_without_double_slash() {
        let config = JobConfig::new("https://ncfu.example.com/", MailConfig::log_only("me"));
        assert_eq!(config.resource_url("/ping"), "https://ncfu.example.com/ping");
        assert_eq!(config.resource_url("work"), "https://ncfu.example.com/work");
    }
}
