//! Session configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;
use crate::application::RepositoryTtls;
use crate::domain::conversation::Locale;
use crate::domain::search::DEFAULT_NIGHTS;
use crate::domain::session::Mode;

/// Session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub locale: Locale,

    #[serde(default)]
    pub default_mode: Mode,

    /// Stay length used when only a check-in is known
    #[serde(default = "default_nights")]
    pub default_nights: u32,

    #[serde(default = "default_thread_list_ttl")]
    pub thread_list_ttl_secs: u64,

    #[serde(default = "default_context_ttl")]
    pub context_ttl_secs: u64,

    /// Where the local identity and search history live
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl SessionConfig {
    pub fn repository_ttls(&self) -> RepositoryTtls {
        RepositoryTtls {
            thread_list: Duration::from_secs(self.thread_list_ttl_secs),
            comparison_context: Duration::from_secs(self.context_ttl_secs),
        }
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_nights == 0 {
            return Err(ValidationError::InvalidNights);
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            default_mode: Mode::default(),
            default_nights: default_nights(),
            thread_list_ttl_secs: default_thread_list_ttl(),
            context_ttl_secs: default_context_ttl(),
            state_dir: default_state_dir(),
        }
    }
}

fn default_nights() -> u32 {
    DEFAULT_NIGHTS
}

fn default_thread_list_ttl() -> u64 {
    30
}

fn default_context_ttl() -> u64 {
    15
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".rate-concierge")
}
