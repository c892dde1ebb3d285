//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `RATE_CONCIERGE` prefix
//! and nested values are separated by double underscores.
//!
//! # Example
//!
//! ```no_run
//! use rate_concierge::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Agent at {}", config.agent.base_url);
//! ```

mod agent;
mod error;
mod logging;
mod persistence;
mod session;

pub use agent::AgentConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::LoggingConfig;
pub use persistence::PersistenceConfig;
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Pricing agent service
    pub agent: AgentConfig,

    /// Thread persistence service
    pub persistence: PersistenceConfig,

    /// Session defaults and local state
    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Loads `.env` if present, then reads `RATE_CONCIERGE__*` variables.
    ///
    /// # Environment Variable Format
    ///
    /// - `RATE_CONCIERGE__AGENT__BASE_URL=...` -> `agent.base_url = ...`
    /// - `RATE_CONCIERGE__SESSION__LOCALE=zh` -> `session.locale = zh`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("RATE_CONCIERGE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for malformed URLs, zero timeouts or a
    /// zero default stay length.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.agent.validate()?;
        self.persistence.validate()?;
        self.session.validate()?;
        Ok(())
    }
}
