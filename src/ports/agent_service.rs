//! Agent Service Port - Interface for the external pricing agent.
//!
//! The agent answers free-form messages, runs structured price comparisons
//! and suggests a cheapest booking strategy. Implementations translate these
//! calls to the agent's HTTP API.
//!
//! # Error Classes
//!
//! - transport failures (`Network`, `Cancelled`) are never retried
//! - `RetryableServer` (429/503) may be retried by a resilience wrapper
//! - `Timeout` is distinct and never reinterpreted as a network error

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::comparison::{AgentReply, ComparisonContext, ReplyParseError, ReplyStatus};
use crate::domain::foundation::{ErrorCode, UserId};
use crate::domain::session::{BookingStrategyQuery, CompareParams};

/// Port for the pricing agent.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Sends a free-form message.
    async fn send_message(&self, request: AgentMessageRequest) -> Result<AgentEnvelope, AgentError>;

    /// Runs a structured price comparison.
    async fn compare(&self, request: CompareRequest) -> Result<AgentEnvelope, AgentError>;

    /// Looks up the cheapest booking strategy for an evaluated hotel.
    async fn booking_strategy(
        &self,
        query: BookingStrategyQuery,
    ) -> Result<BookingStrategyReply, AgentError>;
}

/// Body of `POST /agent/message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessageRequest {
    pub user_id: UserId,
    pub message_text: String,
    pub force_dispatch: bool,
    /// Latest comparison, sent with follow-ups while it has not expired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_context: Option<ComparisonContext>,
}

impl AgentMessageRequest {
    pub fn new(user_id: UserId, message_text: impl Into<String>) -> Self {
        Self {
            user_id,
            message_text: message_text.into(),
            force_dispatch: true,
            comparison_context: None,
        }
    }

    pub fn with_context(mut self, context: Option<ComparisonContext>) -> Self {
        self.comparison_context = context;
        self
    }
}

/// Body of `POST /agent/compare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareRequest {
    pub user_id: UserId,
    pub params: CompareParams,
    pub timestamp: DateTime<Utc>,
    pub channel: String,
}

/// Envelope returned by `message` and `compare`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEnvelope {
    pub status: ReplyStatus,
    #[serde(default)]
    pub reply_type: Option<String>,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub reply_json: Option<Value>,
    #[serde(default)]
    pub aggregated_count: Option<u32>,
}

impl AgentEnvelope {
    pub fn buffered() -> Self {
        Self {
            status: ReplyStatus::Buffered,
            reply_type: None,
            reply: None,
            reply_json: None,
            aggregated_count: None,
        }
    }

    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Processed,
            reply_type: Some("text".to_string()),
            reply: Some(reply.into()),
            reply_json: None,
            aggregated_count: None,
        }
    }

    /// Evaluation carried as a JSON string in `reply`.
    pub fn evaluation(reply: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Processed,
            reply_type: Some(crate::domain::comparison::EVALUATION_REPLY_TYPE.to_string()),
            reply: Some(reply.into()),
            reply_json: None,
            aggregated_count: None,
        }
    }

    /// Validates the envelope into a typed reply.
    pub fn interpret(&self) -> Result<AgentReply, AgentError> {
        AgentReply::interpret(
            self.status,
            self.reply_type.as_deref(),
            self.reply.as_deref(),
            self.reply_json.as_ref(),
        )
        .map_err(AgentError::from)
    }
}

/// Reply of `GET /agent/booking_strategy/cheapest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStrategyReply {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reply: String,
}

/// Errors from agent calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// The call exceeded its hard ceiling and was cancelled.
    #[error("agent call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// DNS, connection or other transport failure.
    #[error("network error: {0}")]
    Network(String),

    /// The request was aborted before it completed.
    #[error("request cancelled")]
    Cancelled,

    /// 429 or 503: the service asked us to come back later.
    #[error("agent service busy (status {status})")]
    RetryableServer { status: u16 },

    /// Any other non-success status.
    #[error("agent service error (status {status}): {body}")]
    Server { status: u16, body: String },

    /// The reply could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl AgentError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Self::Server {
            status,
            body: body.into(),
        }
    }

    /// Maps an HTTP status to an error. 429 and 503 are retryable.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            429 | 503 => Self::RetryableServer { status },
            _ => Self::server(status, body),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AgentError::RetryableServer { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AgentError::Network(_) | AgentError::Cancelled)
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AgentError::Timeout { .. } => ErrorCode::Timeout,
            AgentError::Network(_) | AgentError::Cancelled | AgentError::Server { .. } => {
                ErrorCode::NetworkError
            }
            AgentError::RetryableServer { .. } => ErrorCode::ServiceBusy,
            AgentError::Parse(_) => ErrorCode::ParseError,
        }
    }
}

impl From<ReplyParseError> for AgentError {
    fn from(err: ReplyParseError) -> Self {
        AgentError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_mapping_marks_busy_codes_retryable() {
        assert!(AgentError::from_status(429, "").is_retryable());
        assert!(AgentError::from_status(503, "").is_retryable());
        assert!(!AgentError::from_status(500, "boom").is_retryable());
        assert!(!AgentError::Cancelled.is_retryable());
        assert!(AgentError::Cancelled.is_transport());
    }

    #[test]
    fn timeout_keeps_its_own_code() {
        let err = AgentError::Timeout { timeout_secs: 300 };
        assert_eq!(err.code(), ErrorCode::Timeout);
        assert!(!err.is_transport());
    }

    #[test]
    fn message_request_serializes_force_dispatch() {
        let req = AgentMessageRequest::new(UserId::new("u1").unwrap(), "is there a pool?");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({"user_id": "u1", "message_text": "is there a pool?", "force_dispatch": true})
        );
    }

    #[test]
    fn envelope_deserializes_with_missing_fields() {
        let env: AgentEnvelope = serde_json::from_value(json!({"status": "buffered"})).unwrap();
        assert_eq!(env.interpret().unwrap(), AgentReply::Pending);
    }

    #[test]
    fn malformed_evaluation_is_a_parse_error() {
        let env = AgentEnvelope::evaluation("{not json");
        assert!(matches!(env.interpret(), Err(AgentError::Parse(_))));
    }

    #[test]
    fn booking_strategy_reply_reads_type_field() {
        let reply: BookingStrategyReply =
            serde_json::from_value(json!({"type": "text", "reply": "Book direct."})).unwrap();
        assert_eq!(reply.kind, "text");
    }
}
