//! Notifier adapters.

mod channel_notifier;
mod tracing_notifier;

pub use channel_notifier::ChannelNotifier;
pub use tracing_notifier::TracingNotifier;
