//! Resilient Agent Service - Wrapper adding retry, a hard timeout and
//! cancellation to any AgentService.
//!
//! # Policy
//!
//! - 429/503 are retried after a fixed delay, up to `max_retries` times
//! - the first retry sends [`Notice::StillProcessing`] without waiting on it
//! - transport failures and cancellations are returned immediately
//! - every call races a hard ceiling; on expiry the in-flight attempt is
//!   dropped and [`AgentError::Timeout`] is returned
//! - a busy status that survives the retries surfaces as a network error
//!
//! # Example
//!
//! ```ignore
//! let agent = ResilientAgentService::new(HttpAgentService::new(config)?, notifier)
//!     .with_policy(RetryPolicy::default());
//! let envelope = agent.compare(request).await?;
//! ```

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::domain::session::BookingStrategyQuery;
use crate::ports::{
    AgentEnvelope, AgentError, AgentMessageRequest, AgentService, BookingStrategyReply,
    CompareRequest, Notice, UserNotifier,
};

/// Retry and timeout settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Hard ceiling for a whole call, retries included.
    pub timeout: Duration,
    /// Fixed delay before each retry.
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            retry_delay: Duration::from_millis(3000),
            max_retries: 1,
        }
    }
}

/// Agent service wrapper with retry, timeout and cancellation.
pub struct ResilientAgentService<A: AgentService> {
    inner: A,
    policy: RetryPolicy,
    notifier: Arc<dyn UserNotifier>,
    shutdown: CancellationToken,
}

impl<A: AgentService> ResilientAgentService<A> {
    pub fn new(inner: A, notifier: Arc<dyn UserNotifier>) -> Self {
        Self {
            inner,
            policy: RetryPolicy::default(),
            notifier,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Cancelling this token aborts every in-flight call with
    /// [`AgentError::Cancelled`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs one logical call under the timeout.
    async fn call<T, F, Fut>(&self, operation: &'static str, attempt: F) -> Result<T, AgentError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, AgentError>> + Send,
        T: Send,
    {
        let token = self.shutdown.child_token();
        // Released on every exit path, cancelling anything still bound to it.
        let _guard = token.clone().drop_guard();

        tokio::select! {
            result = self.with_retries(operation, &attempt, &token) => result,
            _ = sleep(self.policy.timeout) => {
                token.cancel();
                tracing::warn!(
                    operation,
                    timeout_secs = self.policy.timeout.as_secs(),
                    "Agent call timed out"
                );
                Err(AgentError::Timeout {
                    timeout_secs: self.policy.timeout.as_secs(),
                })
            }
        }
    }

    async fn with_retries<T, F, Fut>(
        &self,
        operation: &'static str,
        attempt: &F,
        token: &CancellationToken,
    ) -> Result<T, AgentError>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, AgentError>> + Send,
        T: Send,
    {
        let mut retries = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(AgentError::Cancelled),
                result = attempt() => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                tracing::debug!(operation, error = %err, "Agent call failed");
                return Err(err);
            }

            if retries >= self.policy.max_retries {
                tracing::warn!(operation, retries, error = %err, "Agent still busy after retries");
                return Err(AgentError::network(format!("{} after {} retries", err, retries)));
            }

            retries += 1;
            if retries == 1 {
                self.notifier.notify(Notice::StillProcessing);
            }
            tracing::info!(
                operation,
                retry = retries,
                delay_ms = self.policy.retry_delay.as_millis() as u64,
                error = %err,
                "Retrying agent call"
            );

            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(AgentError::Cancelled),
                _ = sleep(self.policy.retry_delay) => {}
            }
        }
    }
}

#[async_trait]
impl<A: AgentService + 'static> AgentService for ResilientAgentService<A> {
    async fn send_message(&self, request: AgentMessageRequest) -> Result<AgentEnvelope, AgentError> {
        let inner = &self.inner;
        self.call("message", move || inner.send_message(request.clone()))
            .await
    }

    async fn compare(&self, request: CompareRequest) -> Result<AgentEnvelope, AgentError> {
        let inner = &self.inner;
        self.call("compare", move || inner.compare(request.clone()))
            .await
    }

    async fn booking_strategy(
        &self,
        query: BookingStrategyQuery,
    ) -> Result<BookingStrategyReply, AgentError> {
        let inner = &self.inner;
        self.call("booking_strategy", move || inner.booking_strategy(query.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::agent::MockAgentService;
    use crate::adapters::notify::ChannelNotifier;
    use crate::domain::foundation::UserId;
    use tokio::time::Instant;

    fn request() -> AgentMessageRequest {
        AgentMessageRequest::new(UserId::new("u1").unwrap(), "any rooms left?")
    }

    fn wrap(mock: MockAgentService) -> (ResilientAgentService<MockAgentService>, ChannelNotifier) {
        let notifier = ChannelNotifier::new();
        let agent = ResilientAgentService::new(mock, Arc::new(notifier.clone()));
        (agent, notifier)
    }

    #[tokio::test(start_paused = true)]
    async fn busy_once_then_success_takes_two_attempts() {
        let mock = MockAgentService::new()
            .with_error(AgentError::RetryableServer { status: 429 })
            .with_envelope(AgentEnvelope::text("ok"));
        let (agent, notifier) = wrap(mock.clone());

        let start = Instant::now();
        let envelope = agent.send_message(request()).await.unwrap();

        assert_eq!(envelope.reply.as_deref(), Some("ok"));
        assert_eq!(mock.call_count(), 2);
        assert!(start.elapsed() >= Duration::from_millis(3000));
        assert_eq!(notifier.drain(), vec![Notice::StillProcessing]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_never_retried() {
        let mock = MockAgentService::new()
            .with_error(AgentError::Cancelled)
            .with_envelope(AgentEnvelope::text("unused"));
        let (agent, notifier) = wrap(mock.clone());

        let err = agent.send_message(request()).await.unwrap_err();

        assert_eq!(err, AgentError::Cancelled);
        assert_eq!(mock.call_count(), 1);
        assert!(notifier.drain().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_is_never_retried() {
        let mock = MockAgentService::new().with_error(AgentError::network("connection refused"));
        let (agent, _) = wrap(mock.clone());

        assert!(matches!(
            agent.send_message(request()).await,
            Err(AgentError::Network(_))
        ));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn busy_twice_surfaces_as_network_error() {
        let mock = MockAgentService::new()
            .with_error(AgentError::RetryableServer { status: 503 })
            .with_error(AgentError::RetryableServer { status: 503 });
        let (agent, notifier) = wrap(mock.clone());

        let err = agent.send_message(request()).await.unwrap_err();

        assert!(matches!(err, AgentError::Network(_)));
        assert_eq!(mock.call_count(), 2);
        assert_eq!(notifier.drain().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_error_is_not_retried() {
        let mock = MockAgentService::new().with_error(AgentError::server(500, "boom"));
        let (agent, _) = wrap(mock.clone());

        assert!(matches!(
            agent.send_message(request()).await,
            Err(AgentError::Server { status: 500, .. })
        ));
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out_and_is_dropped() {
        let mock = MockAgentService::new()
            .with_delay(Duration::from_secs(400))
            .with_envelope(AgentEnvelope::text("too late"));
        let (agent, _) = wrap(mock.clone());

        let start = Instant::now();
        let err = agent.send_message(request()).await.unwrap_err();

        assert_eq!(err, AgentError::Timeout { timeout_secs: 300 });
        assert!(start.elapsed() >= Duration::from_secs(300));
        assert!(start.elapsed() < Duration::from_secs(400));
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.completed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_in_flight_call() {
        let mock = MockAgentService::new().with_delay(Duration::from_secs(60));
        let (agent, _) = wrap(mock.clone());
        let token = agent.shutdown_token();

        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let err = agent.send_message(request()).await.unwrap_err();
        assert_eq!(err, AgentError::Cancelled);
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.completed_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_policy_allows_more_retries() {
        let mock = MockAgentService::new()
            .with_error(AgentError::RetryableServer { status: 429 })
            .with_error(AgentError::RetryableServer { status: 429 })
            .with_envelope(AgentEnvelope::text("third time"));
        let (agent, notifier) = wrap(mock.clone());
        let agent = agent.with_policy(RetryPolicy {
            max_retries: 2,
            retry_delay: Duration::from_millis(10),
            ..RetryPolicy::default()
        });

        let envelope = agent.send_message(request()).await.unwrap();
        assert_eq!(envelope.reply.as_deref(), Some("third time"));
        assert_eq!(mock.call_count(), 3);
        assert_eq!(notifier.drain(), vec![Notice::StillProcessing]);
    }
}
