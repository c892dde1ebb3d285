//! HTTP Agent Service - Implementation of AgentService over the agent's REST API.
//!
//! Each method performs exactly one HTTP exchange. Retries, the hard timeout
//! and cancellation belong to [`super::ResilientAgentService`].
//!
//! # Endpoints
//!
//! - `POST {base}/agent/message`
//! - `POST {base}/agent/compare`
//! - `GET  {base}/agent/booking_strategy/cheapest?hotelId&checkIn&checkOut`

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::domain::session::BookingStrategyQuery;
use crate::ports::{
    AgentEnvelope, AgentError, AgentMessageRequest, AgentService, BookingStrategyReply,
    CompareRequest,
};

/// Configuration for the HTTP agent client.
#[derive(Debug, Clone)]
pub struct HttpAgentConfig {
    /// Base URL of the agent service, without a trailing slash.
    pub base_url: String,
    /// Connection establishment timeout.
    pub connect_timeout: Duration,
}

impl HttpAgentConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Agent service client.
pub struct HttpAgentService {
    config: HttpAgentConfig,
    client: Client,
}

impl HttpAgentService {
    pub fn new(config: HttpAgentConfig) -> Result<Self, AgentError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AgentError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn booking_strategy_url(&self) -> String {
        self.url("/agent/booking_strategy/cheapest")
    }

    fn map_send_error(e: reqwest::Error) -> AgentError {
        if e.is_connect() {
            AgentError::network(format!("Connection failed: {}", e))
        } else {
            AgentError::network(e.to_string())
        }
    }

    /// Parses the response status and decodes a success body.
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AgentError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::from_status(status.as_u16(), body));
        }

        let body = response.text().await.map_err(Self::map_send_error)?;
        serde_json::from_str(&body).map_err(|e| AgentError::parse(format!("invalid agent response: {}", e)))
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    async fn send_message(&self, request: AgentMessageRequest) -> Result<AgentEnvelope, AgentError> {
        tracing::debug!(user_id = %request.user_id, "POST /agent/message");
        let response = self
            .client
            .post(self.url("/agent/message"))
            .json(&request)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::decode(response).await
    }

    async fn compare(&self, request: CompareRequest) -> Result<AgentEnvelope, AgentError> {
        tracing::debug!(
            user_id = %request.user_id,
            hotel = %request.params.hotel_name,
            "POST /agent/compare"
        );
        let response = self
            .client
            .post(self.url("/agent/compare"))
            .json(&request)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::decode(response).await
    }

    async fn booking_strategy(
        &self,
        query: BookingStrategyQuery,
    ) -> Result<BookingStrategyReply, AgentError> {
        tracing::debug!(hotel_id = %query.hotel_id, "GET /agent/booking_strategy/cheapest");
        let check_in = query.check_in.format("%Y-%m-%d").to_string();
        let check_out = query.check_out.format("%Y-%m-%d").to_string();
        let response = self
            .client
            .get(self.booking_strategy_url())
            .query(&[
                ("hotelId", query.hotel_id.as_str()),
                ("checkIn", check_in.as_str()),
                ("checkOut", check_out.as_str()),
            ])
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_trims_trailing_slash() {
        let config = HttpAgentConfig::new("http://agent.local/").with_connect_timeout(Duration::from_secs(3));
        assert_eq!(config.base_url, "http://agent.local");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn urls_are_built_from_base() {
        let service = HttpAgentService::new(HttpAgentConfig::new("http://agent.local")).unwrap();
        assert_eq!(service.url("/agent/compare"), "http://agent.local/agent/compare");
        assert_eq!(
            service.booking_strategy_url(),
            "http://agent.local/agent/booking_strategy/cheapest"
        );
    }
}
