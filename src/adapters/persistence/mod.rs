//! Thread persistence adapters.

mod http_thread_store;
mod in_memory_thread_store;

pub use http_thread_store::{HttpThreadStore, HttpThreadStoreConfig};
pub use in_memory_thread_store::{InMemoryThreadStore, StoreOperation};
