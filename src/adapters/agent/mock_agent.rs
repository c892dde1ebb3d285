//! Mock agent service for testing.
//!
//! Provides a configurable implementation of the AgentService port so tests
//! run without a live pricing agent.
//!
//! # Features
//!
//! - Queued responses consumed in call order
//! - Simulated latency for timeout testing
//! - Error injection for resilience testing
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let agent = MockAgentService::new()
//!     .with_error(AgentError::RetryableServer { status: 429 })
//!     .with_envelope(AgentEnvelope::text("Here you go"));
//!
//! let envelope = agent.send_message(request).await?;
//! assert_eq!(agent.call_count(), 1);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::session::BookingStrategyQuery;
use crate::ports::{
    AgentEnvelope, AgentError, AgentMessageRequest, AgentService, BookingStrategyReply,
    CompareRequest,
};

/// A recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentCall {
    Message(AgentMessageRequest),
    Compare(CompareRequest),
    BookingStrategy(BookingStrategyQuery),
}

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockAgentResponse {
    Envelope(AgentEnvelope),
    Strategy(BookingStrategyReply),
    Error(AgentError),
}

/// Mock agent service.
#[derive(Debug, Clone)]
pub struct MockAgentService {
    /// Pre-configured responses (consumed in order, shared by all operations).
    responses: Arc<Mutex<VecDeque<MockAgentResponse>>>,
    /// Simulated latency per request.
    delay: Duration,
    /// Every call, including ones that never completed.
    calls: Arc<Mutex<Vec<AgentCall>>>,
    /// Calls that ran past the simulated latency.
    completed: Arc<Mutex<usize>>,
}

impl Default for MockAgentService {
    fn default() -> Self {
        Self::new()
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockAgentService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::new())),
            delay: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
            completed: Arc::new(Mutex::new(0)),
        }
    }

    /// Adds an envelope to the queue.
    pub fn with_envelope(self, envelope: AgentEnvelope) -> Self {
        guard(&self.responses).push_back(MockAgentResponse::Envelope(envelope));
        self
    }

    /// Adds a booking strategy reply to the queue.
    pub fn with_strategy(self, reply: BookingStrategyReply) -> Self {
        guard(&self.responses).push_back(MockAgentResponse::Strategy(reply));
        self
    }

    /// Adds an error to the queue.
    pub fn with_error(self, error: AgentError) -> Self {
        guard(&self.responses).push_back(MockAgentResponse::Error(error));
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queues an envelope on an already shared mock.
    pub fn push_envelope(&self, envelope: AgentEnvelope) {
        guard(&self.responses).push_back(MockAgentResponse::Envelope(envelope));
    }

    pub fn call_count(&self) -> usize {
        guard(&self.calls).len()
    }

    pub fn completed_count(&self) -> usize {
        *guard(&self.completed)
    }

    pub fn get_calls(&self) -> Vec<AgentCall> {
        guard(&self.calls).clone()
    }

    pub fn last_call(&self) -> Option<AgentCall> {
        guard(&self.calls).last().cloned()
    }

    async fn respond(&self, call: AgentCall) -> Option<MockAgentResponse> {
        guard(&self.calls).push(call);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        *guard(&self.completed) += 1;

        guard(&self.responses).pop_front()
    }
}

#[async_trait]
impl AgentService for MockAgentService {
    async fn send_message(&self, request: AgentMessageRequest) -> Result<AgentEnvelope, AgentError> {
        match self.respond(AgentCall::Message(request)).await {
            Some(MockAgentResponse::Envelope(envelope)) => Ok(envelope),
            Some(MockAgentResponse::Error(err)) => Err(err),
            Some(MockAgentResponse::Strategy(_)) => Err(AgentError::parse("unexpected strategy reply")),
            None => Ok(AgentEnvelope::text("Mock reply")),
        }
    }

    async fn compare(&self, request: CompareRequest) -> Result<AgentEnvelope, AgentError> {
        match self.respond(AgentCall::Compare(request)).await {
            Some(MockAgentResponse::Envelope(envelope)) => Ok(envelope),
            Some(MockAgentResponse::Error(err)) => Err(err),
            Some(MockAgentResponse::Strategy(_)) => Err(AgentError::parse("unexpected strategy reply")),
            None => Ok(AgentEnvelope::buffered()),
        }
    }

    async fn booking_strategy(
        &self,
        query: BookingStrategyQuery,
    ) -> Result<BookingStrategyReply, AgentError> {
        match self.respond(AgentCall::BookingStrategy(query)).await {
            Some(MockAgentResponse::Strategy(reply)) => Ok(reply),
            Some(MockAgentResponse::Error(err)) => Err(err),
            Some(MockAgentResponse::Envelope(_)) => Err(AgentError::parse("unexpected envelope")),
            None => Ok(BookingStrategyReply {
                kind: "text".to_string(),
                reply: "Mock strategy".to_string(),
            }),
        }
    }
}
