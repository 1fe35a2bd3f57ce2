//! Session store: the durable per-session turn log.

pub mod sqlite_store;
pub mod store;

pub use sqlite_store::SqliteSessionStore;
pub use store::{InMemorySessionStore, SessionStore};
