//! Agent service adapters.
//!
//! - `HttpAgentService` - reqwest client for the agent's REST API
//! - `ResilientAgentService` - retry, timeout and cancellation wrapper
//! - `MockAgentService` - queued responses for tests

mod http_agent;
mod mock_agent;
mod resilient_agent;

pub use http_agent::{HttpAgentConfig, HttpAgentService};
pub use mock_agent::{AgentCall, MockAgentResponse, MockAgentService};
pub use resilient_agent::{ResilientAgentService, RetryPolicy};
