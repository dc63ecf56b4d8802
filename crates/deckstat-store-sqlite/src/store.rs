//! [`SqliteStore`]: the SQLite implementation of [`LedgerStore`].

use std::{path::Path, time::Duration};

use rusqlite::{OptionalExtension as _, TransactionBehavior};

use deckstat_core::{
  entity::{DeckCatalogEntry, EntityKind, MatchRecord, OwnedDeck, RecordId},
  integrity::IdSet,
  stats::StatsFilter,
  store::{EntityCounts, LedgerStore, UnitOfWork},
};

use crate::{
  Error, Result,
  encode::{
    CATALOG_COLUMNS, DECK_COLUMNS, MATCH_COLUMNS, RawCatalogEntry, RawMatchRecord,
    RawOwnedDeck, encode_date, encode_dt,
  },
  schema::SCHEMA,
};

/// How long a write waits for another connection's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

fn table(kind: EntityKind) -> &'static str {
  match kind {
    EntityKind::CatalogEntry => "catalog_entries",
    EntityKind::OwnedDeck => "owned_decks",
    EntityKind::MatchRecord => "match_records",
  }
}

// ─── Statements ──────────────────────────────────────────────────────────────
//
// Plain functions over a borrowed connection, shared by the store's one-shot
// calls and by units of work running inside a transaction.

fn select_existing(conn: &rusqlite::Connection, probe: &IdSet) -> rusqlite::Result<IdSet> {
  let mut found = IdSet::default();
  for &kind in EntityKind::ALL {
    let ids = probe.get(kind);
    if ids.is_empty() {
      continue;
    }
    let mut stmt =
      conn.prepare_cached(&format!("SELECT 1 FROM {} WHERE id = ?1", table(kind)))?;
    for id in ids {
      if stmt.exists([id.as_str()])? {
        found.insert(kind, id.clone());
      }
    }
  }
  Ok(found)
}

fn insert_catalog_entry(
  conn: &rusqlite::Connection,
  entry: &DeckCatalogEntry,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO catalog_entries (id, class, label, sort_position)
     VALUES (?1, ?2, ?3, ?4)",
    rusqlite::params![
      entry.id.as_str(),
      entry.class.as_str(),
      entry.label,
      entry.sort_position,
    ],
  )?;
  Ok(())
}

fn insert_owned_deck(conn: &rusqlite::Connection, deck: &OwnedDeck) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO owned_decks (
       id, catalog_ref, deck_code, label, active, owner_ref, created_at, updated_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      deck.id.as_str(),
      deck.catalog_ref.as_str(),
      deck.deck_code,
      deck.label,
      deck.active,
      deck.owner_ref,
      encode_dt(deck.created_at),
      encode_dt(deck.updated_at),
    ],
  )?;
  Ok(())
}

fn insert_match_record(
  conn: &rusqlite::Connection,
  record: &MatchRecord,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO match_records (
       id, date, match_type, rank, rank_group, owned_deck_ref,
       turn, outcome, opponent_ref, season, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    rusqlite::params![
      record.id.as_str(),
      encode_date(record.date),
      record.match_type.as_str(),
      record.rank.as_str(),
      record.group.as_str(),
      record.owned_deck_ref.as_str(),
      record.turn.as_str(),
      record.outcome.as_str(),
      record.opponent_ref.as_str(),
      record.season,
      encode_dt(record.created_at),
    ],
  )?;
  Ok(())
}

fn count_where(
  conn: &rusqlite::Connection,
  kind: EntityKind,
  column: &str,
  id: &str,
) -> rusqlite::Result<u64> {
  let count: i64 = conn.query_row(
    &format!("SELECT COUNT(*) FROM {} WHERE {column} = ?1", table(kind)),
    [id],
    |r| r.get(0),
  )?;
  Ok(count as u64)
}

// ─── Unit of work ────────────────────────────────────────────────────────────

/// A unit of work bound to an open `IMMEDIATE` transaction.
struct SqliteUnitOfWork<'c> {
  conn: &'c rusqlite::Connection,
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
  type Error = Error;

  fn existing_ids(&mut self, probe: &IdSet) -> Result<IdSet> {
    Ok(select_existing(self.conn, probe)?)
  }

  fn insert_catalog_entry(&mut self, entry: &DeckCatalogEntry) -> Result<()> {
    Ok(insert_catalog_entry(self.conn, entry)?)
  }

  fn insert_owned_deck(&mut self, deck: &OwnedDeck) -> Result<()> {
    Ok(insert_owned_deck(self.conn, deck)?)
  }

  fn insert_match_record(&mut self, record: &MatchRecord) -> Result<()> {
    Ok(insert_match_record(self.conn, record)?)
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A deckstat ledger backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Delete `id` from `kind`'s table unless a row in one of `referrers`
  /// still points at it. Check and delete share one transaction.
  async fn guarded_delete(
    &self,
    kind: EntityKind,
    id: RecordId,
    referrers: &'static [(EntityKind, &'static str)],
  ) -> Result<()> {
    let key = id.as_str().to_owned();

    let (exists, blocking): (bool, Option<(EntityKind, u64)>) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
          .query_row(&format!("SELECT 1 FROM {} WHERE id = ?1", table(kind)), [&key], |_| {
            Ok(())
          })
          .optional()?
          .is_some();

        let mut blocking = None;
        if exists {
          for &(referrer, column) in referrers {
            let count = count_where(&tx, referrer, column, &key)?;
            if count > 0 {
              blocking = Some((referrer, count));
              break;
            }
          }
          if blocking.is_none() {
            tx.execute(&format!("DELETE FROM {} WHERE id = ?1", table(kind)), [&key])?;
          }
        }

        tx.commit()?;
        Ok((exists, blocking))
      })
      .await?;

    if !exists {
      return Err(deckstat_core::Error::NotFound { kind, id }.into());
    }
    if let Some((referenced_by, references)) = blocking {
      return Err(
        deckstat_core::Error::DeleteConstraint { kind, id, references, referenced_by }.into(),
      );
    }
    Ok(())
  }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── Migration support ─────────────────────────────────────────────────────

  async fn existing_ids(&self, probe: IdSet) -> Result<IdSet> {
    let found = self
      .conn
      .call(move |conn| Ok(select_existing(conn, &probe)?))
      .await?;
    Ok(found)
  }

  async fn atomically<F, T>(&self, work: F) -> Result<T>
  where
    F: FnOnce(&mut dyn UnitOfWork<Error = Self::Error>) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    // The outer result is the connection's; the inner one is the work's.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = work(&mut SqliteUnitOfWork { conn: &tx });
        match outcome {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(err) => {
            tx.rollback()?;
            Ok(Err(err))
          }
        }
      })
      .await?
  }

  async fn counts(&self) -> Result<EntityCounts> {
    let counts = self
      .conn
      .call(|conn| {
        let count = |kind: EntityKind| -> rusqlite::Result<u64> {
          let n: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table(kind)), [], |r| r.get(0))?;
          Ok(n as u64)
        };
        Ok(EntityCounts {
          catalog_entries: count(EntityKind::CatalogEntry)?,
          owned_decks:     count(EntityKind::OwnedDeck)?,
          match_records:   count(EntityKind::MatchRecord)?,
        })
      })
      .await?;
    Ok(counts)
  }

  // ── Catalog entries ───────────────────────────────────────────────────────

  async fn get_catalog_entry(&self, id: RecordId) -> Result<Option<DeckCatalogEntry>> {
    let raw: Option<RawCatalogEntry> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {CATALOG_COLUMNS} FROM catalog_entries WHERE id = ?1"),
            [id.as_str()],
            RawCatalogEntry::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCatalogEntry::into_entry).transpose()
  }

  async fn list_catalog_entries(&self) -> Result<Vec<DeckCatalogEntry>> {
    let raws: Vec<RawCatalogEntry> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CATALOG_COLUMNS} FROM catalog_entries ORDER BY sort_position, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawCatalogEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCatalogEntry::into_entry).collect()
  }

  async fn delete_catalog_entry(&self, id: RecordId) -> Result<()> {
    self
      .guarded_delete(EntityKind::CatalogEntry, id, &[
        (EntityKind::MatchRecord, "opponent_ref"),
        (EntityKind::OwnedDeck, "catalog_ref"),
      ])
      .await
  }

  // ── Owned decks ───────────────────────────────────────────────────────────

  async fn get_owned_deck(&self, id: RecordId) -> Result<Option<OwnedDeck>> {
    let raw: Option<RawOwnedDeck> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {DECK_COLUMNS} FROM owned_decks WHERE id = ?1"),
            [id.as_str()],
            RawOwnedDeck::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawOwnedDeck::into_deck).transpose()
  }

  async fn list_owned_decks(&self, active_only: bool) -> Result<Vec<OwnedDeck>> {
    let raws: Vec<RawOwnedDeck> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DECK_COLUMNS} FROM owned_decks
           WHERE (?1 = 0 OR active = 1)
           ORDER BY rowid"
        ))?;
        let rows = stmt
          .query_map([active_only], RawOwnedDeck::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOwnedDeck::into_deck).collect()
  }

  async fn delete_owned_deck(&self, id: RecordId) -> Result<()> {
    self
      .guarded_delete(EntityKind::OwnedDeck, id, &[(EntityKind::MatchRecord, "owned_deck_ref")])
      .await
  }

  // ── Match records ─────────────────────────────────────────────────────────

  async fn get_match_record(&self, id: RecordId) -> Result<Option<MatchRecord>> {
    let raw: Option<RawMatchRecord> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {MATCH_COLUMNS} FROM match_records WHERE id = ?1"),
            [id.as_str()],
            RawMatchRecord::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawMatchRecord::into_record).transpose()
  }

  async fn match_records(&self, filter: &StatsFilter) -> Result<Vec<MatchRecord>> {
    let start = filter.start_date.map(encode_date);
    let end = filter.end_date.map(encode_date);
    let season = filter.season;
    let match_type = filter.match_type.map(|t| t.as_str());

    let raws: Vec<RawMatchRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MATCH_COLUMNS} FROM match_records
           WHERE (?1 IS NULL OR date >= ?1)
             AND (?2 IS NULL OR date <= ?2)
             AND (?3 IS NULL OR season = ?3)
             AND (?4 IS NULL OR match_type = ?4)
           ORDER BY date, created_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![start, end, season, match_type], RawMatchRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMatchRecord::into_record).collect()
  }
}
