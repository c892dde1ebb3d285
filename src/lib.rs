//! Rate Concierge - conversational hotel price comparison assistant.
//!
//! Routes each user utterance either to a structured price comparison or to
//! free-form chat, calls the pricing agent with retry and timeout, and keeps
//! conversation threads in a persistence service behind a read-through
//! cache.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
