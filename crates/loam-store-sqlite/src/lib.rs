//! SQLite backend for the Loam knowledge store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! pool without blocking the async runtime. The fast search path is an FTS5
//! virtual table; when FTS5 is missing from the linked SQLite the store runs
//! in substring-fallback mode.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
