//! Adapters - Implementations of port interfaces.
//!
//! - `agent` - pricing agent over HTTP, plus the resilience wrapper and a mock
//! - `persistence` - thread store over HTTP and in memory
//! - `storage` - local profile (user id, search history) as YAML or in memory
//! - `notify` - notice delivery through tracing or a channel

pub mod agent;
pub mod notify;
pub mod persistence;
pub mod storage;
