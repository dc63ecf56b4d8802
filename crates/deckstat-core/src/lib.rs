//! Core types and engine logic for the deckstat match ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the entity model, the validation and integrity checks that guard the
//! legacy-data migration, the commit orchestration, and the statistics
//! aggregator. Storage is reached only through [`store::LedgerStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod batch;
pub mod date;
pub mod entity;
pub mod error;
pub mod integrity;
pub mod migrate;
pub mod stats;
pub mod store;
pub mod validate;
pub mod vocab;

pub use error::{Error, Result};
