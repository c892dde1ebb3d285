//! Pricing agent configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::adapters::agent::{HttpAgentConfig, RetryPolicy};

/// Pricing agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Agent service base URL
    pub base_url: String,

    /// Hard limit for one agent exchange, retries included
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Delay before retrying a 429/503
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Sent with every comparison
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl AgentConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            timeout: self.timeout(),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            max_retries: self.max_retries,
        }
    }

    pub fn http(&self) -> HttpAgentConfig {
        HttpAgentConfig::new(self.base_url.clone())
    }

    /// Validate agent configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("AGENT__BASE_URL"));
        }
        if !is_http_url(&self.base_url) {
            return Err(ValidationError::InvalidUrl("agent.base_url"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("agent.timeout_secs"));
        }
        if self.channel.trim().is_empty() {
            return Err(ValidationError::EmptyChannel);
        }
        Ok(())
    }
}

pub(super) fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn default_timeout() -> u64 {
    300
}

fn default_retry_delay() -> u64 {
    3000
}

fn default_retries() -> u32 {
    1
}

fn default_channel() -> String {
    "web".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AgentConfig {
        AgentConfig {
            base_url: "https://agent.example.com".to_string(),
            timeout_secs: default_timeout(),
            retry_delay_ms: default_retry_delay(),
            max_retries: default_retries(),
            channel: default_channel(),
        }
    }

    #[test]
    fn retry_policy_matches_settings() {
        let policy = config().retry_policy();
        assert_eq!(policy.timeout, Duration::from_secs(300));
        assert_eq!(policy.retry_delay, Duration::from_millis(3000));
        assert_eq!(policy.max_retries, 1);
    }

    #[test]
    fn rejects_non_http_url() {
        let config = AgentConfig {
            base_url: "ftp://agent".to_string(),
            ..config()
        };
        assert_eq!(config.validate(), Err(ValidationError::InvalidUrl("agent.base_url")));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = AgentConfig {
            timeout_secs: 0,
            ..config()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidTimeout(_))));
    }
}
