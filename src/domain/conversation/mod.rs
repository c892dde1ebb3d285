//! Conversation module - threads, messages and user-facing copy.

mod locale;
mod message;
mod thread;

pub use locale::Locale;
pub use message::{Message, MessageKind, MessageRole};
pub use thread::{thread_title, NewThread, Thread, ThreadPatch};
