//! The `LedgerStore` trait: the persisted storage boundary.
//!
//! The trait is implemented by storage backends (e.g.
//! `deckstat-store-sqlite`). The migration engine and the HTTP layer depend
//! on this abstraction, never on a concrete backend, and receive the store
//! explicitly on every call.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  entity::{DeckCatalogEntry, MatchRecord, OwnedDeck, RecordId},
  integrity::IdSet,
  stats::StatsFilter,
};

// ─── Unit of work ────────────────────────────────────────────────────────────

/// The write surface available inside one atomic unit of work.
///
/// Everything done through a `UnitOfWork` lands together or not at all: if
/// the closure passed to [`LedgerStore::atomically`] returns `Err`, every
/// insert made through it is rolled back.
pub trait UnitOfWork {
  type Error;

  /// The subset of `probe` that exists as seen from inside this unit.
  fn existing_ids(&mut self, probe: &IdSet) -> Result<IdSet, Self::Error>;

  fn insert_catalog_entry(&mut self, entry: &DeckCatalogEntry) -> Result<(), Self::Error>;

  fn insert_owned_deck(&mut self, deck: &OwnedDeck) -> Result<(), Self::Error>;

  fn insert_match_record(&mut self, record: &MatchRecord) -> Result<(), Self::Error>;
}

// ─── Domain classification ───────────────────────────────────────────────────

/// Lets callers that only know `S::Error` recover domain failures (missing
/// records, refused deletes) from a backend error.
pub trait AsCoreError {
  fn as_core(&self) -> Option<&crate::Error>;
}

// ─── Counts ──────────────────────────────────────────────────────────────────

/// Row counts per entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCounts {
  pub catalog_entries: u64,
  pub owned_decks:     u64,
  pub match_records:   u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a deckstat storage backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + AsCoreError + Send + Sync + 'static;

  // ── Migration support ─────────────────────────────────────────────────

  /// The subset of `probe` that is already persisted.
  fn existing_ids(
    &self,
    probe: IdSet,
  ) -> impl Future<Output = Result<IdSet, Self::Error>> + Send + '_;

  /// Run `work` inside one all-or-nothing unit of work.
  ///
  /// Concurrent calls are serialised. If `work` returns `Err`, or the
  /// backend fails while committing, no write made by `work` survives.
  fn atomically<F, T>(
    &self,
    work: F,
  ) -> impl Future<Output = Result<T, Self::Error>> + Send + '_
  where
    F: FnOnce(&mut dyn UnitOfWork<Error = Self::Error>) -> Result<T, Self::Error>
      + Send
      + 'static,
    T: Send + 'static;

  fn counts(&self) -> impl Future<Output = Result<EntityCounts, Self::Error>> + Send + '_;

  // ── Catalog entries ───────────────────────────────────────────────────

  fn get_catalog_entry(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<Option<DeckCatalogEntry>, Self::Error>> + Send + '_;

  /// All entries, ordered by sort position then insertion order.
  fn list_catalog_entries(
    &self,
  ) -> impl Future<Output = Result<Vec<DeckCatalogEntry>, Self::Error>> + Send + '_;

  /// Delete an entry that nothing references.
  ///
  /// Fails with [`crate::Error::DeleteConstraint`] while any match record or
  /// owned deck points at it, and [`crate::Error::NotFound`] if absent.
  fn delete_catalog_entry(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Owned decks ───────────────────────────────────────────────────────

  fn get_owned_deck(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<Option<OwnedDeck>, Self::Error>> + Send + '_;

  /// All decks in insertion order, optionally only active ones.
  fn list_owned_decks(
    &self,
    active_only: bool,
  ) -> impl Future<Output = Result<Vec<OwnedDeck>, Self::Error>> + Send + '_;

  /// Delete a deck that no match record references.
  fn delete_owned_deck(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Match records ─────────────────────────────────────────────────────

  fn get_match_record(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<Option<MatchRecord>, Self::Error>> + Send + '_;

  /// Records matching `filter`, ordered by date, then `created_at`, then
  /// insertion order.
  fn match_records<'a>(
    &'a self,
    filter: &'a StatsFilter,
  ) -> impl Future<Output = Result<Vec<MatchRecord>, Self::Error>> + Send + 'a;
}
