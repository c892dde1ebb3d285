//! Persistence service configuration

use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;

use super::agent::is_http_url;
use super::error::ValidationError;
use crate::adapters::persistence::HttpThreadStoreConfig;

/// Persistence service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Persistence REST API base URL
    pub base_url: String,

    /// Optional bearer token
    pub api_token: Option<Secret<String>>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl PersistenceConfig {
    pub fn http(&self) -> HttpThreadStoreConfig {
        let config = HttpThreadStoreConfig::new(self.base_url.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match &self.api_token {
            Some(token) => config.with_api_token(token.clone()),
            None => config,
        }
    }

    /// Validate persistence configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("PERSISTENCE__BASE_URL"));
        }
        if !is_http_url(&self.base_url) {
            return Err(ValidationError::InvalidUrl("persistence.base_url"));
        }
        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("persistence.timeout_secs"));
        }
        Ok(())
    }
}

fn default_timeout() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client_config_with_token() {
        let config = PersistenceConfig {
            base_url: "https://db.example.com/".to_string(),
            api_token: Some(Secret::new("token".to_string())),
            timeout_secs: 5,
        };
        assert!(config.validate().is_ok());

        let http = config.http();
        assert_eq!(http.base_url, "https://db.example.com");
        assert_eq!(http.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_url_is_reported() {
        let config = PersistenceConfig {
            base_url: " ".to_string(),
            api_token: None,
            timeout_secs: 5,
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("PERSISTENCE__BASE_URL"))
        );
    }
}
