//! Local profile storage adapters (user id and search history).

mod file_profile_store;
mod in_memory_profile_store;

pub use file_profile_store::{FileProfileStore, LocalProfile};
pub use in_memory_profile_store::InMemoryProfileStore;
