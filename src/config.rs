// src/config.rs

//! Runtime configuration.
//!
//! Mail credentials and run-mode switches come from the environment and are
//! read exactly once at startup. HTTP behavior knobs live in [`HttpConfig`]
//! with defaults matching the production deployment.

use std::env;

use crate::error::{AppError, Result};

/// HTTP client and pacing behavior.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// User-Agent header for all requests
    pub user_agent: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Delay after each entrance page fetch, in milliseconds
    pub entrance_delay_ms: u64,

    /// Delay after each notification send, in milliseconds
    pub notify_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X) AppleWebKit/537.36 \
                         (KHTML, like Gecko) MonitorBot/1.0"
                .to_string(),
            timeout_secs: 25,
            entrance_delay_ms: 2000,
            notify_delay_ms: 1000,
        }
    }
}

impl HttpConfig {
    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// SMTP transport settings from the environment.
///
/// `sender`/`password` are `None` when the corresponding variables are unset;
/// the caller is expected to fall back to a disabled notifier in that case
/// rather than fail the run.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub sender: Option<String>,
    pub password: Option<String>,
    pub recipient: String,
    /// Display name used in the From header
    pub from_name: String,
}

impl MailConfig {
    /// Read mail settings from the environment.
    pub fn from_env() -> Result<Self> {
        let port = match env::var("SMTP_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| AppError::config(format!("SMTP_PORT is not a port number: {e}")))?,
            Err(_) => 587,
        };

        Ok(Self {
            host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            port,
            sender: env::var("SMTP_SENDER").ok().filter(|s| !s.is_empty()),
            password: env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty()),
            recipient: env::var("RECIPIENT_EMAIL")
                .unwrap_or_else(|_| "57180928miwa@gmail.com".to_string()),
            from_name: env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "サイト監視".to_string()),
        })
    }

    /// Whether credentials are complete enough to open an SMTP session.
    pub fn has_credentials(&self) -> bool {
        self.sender.is_some() && self.password.is_some()
    }
}

/// Operator override switches for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunMode {
    /// Send at most one sample notification per site, ever
    pub force_sample: bool,

    /// Send a fixed diagnostic mail when the run produced zero notifications
    pub force_empty_mail: bool,
}

impl RunMode {
    /// Read run-mode switches from the environment (`FORCE_SAMPLE`,
    /// `FORCE_MAIL`, each enabled by the value `1`).
    pub fn from_env() -> Self {
        Self {
            force_sample: env_flag("FORCE_SAMPLE"),
            force_empty_mail: env_flag("FORCE_MAIL"),
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|v| v == "1").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_http_config_ok() {
        assert!(HttpConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = HttpConfig::default();
        config.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = HttpConfig::default();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
