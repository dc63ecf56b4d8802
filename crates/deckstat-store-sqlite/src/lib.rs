//! SQLite backend for the deckstat match ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on one dedicated
//! thread without blocking the async runtime. Because every call is queued on
//! that thread, units of work never interleave.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
