//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed nanosecond
//! width, so lexical order is chronological order. Dates use the canonical
//! `YYYY-MM-DD` form for the same reason. Vocabulary values are stored as
//! their canonical snake_case spelling.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use deckstat_core::{
  date::{CANONICAL_FORMAT, format_date},
  entity::{DeckCatalogEntry, MatchRecord, OwnedDeck},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(date: NaiveDate) -> String { format_date(date) }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, CANONICAL_FORMAT)
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const CATALOG_COLUMNS: &str = "id, class, label, sort_position";

/// Raw values read directly from a `catalog_entries` row.
pub struct RawCatalogEntry {
  pub id:            String,
  pub class:         String,
  pub label:         String,
  pub sort_position: u32,
}

impl RawCatalogEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      class:         row.get(1)?,
      label:         row.get(2)?,
      sort_position: row.get(3)?,
    })
  }

  pub fn into_entry(self) -> Result<DeckCatalogEntry> {
    Ok(DeckCatalogEntry {
      id:            self.id.into(),
      class:         self.class.parse()?,
      label:         self.label,
      sort_position: self.sort_position,
    })
  }
}

pub const DECK_COLUMNS: &str =
  "id, catalog_ref, deck_code, label, active, owner_ref, created_at, updated_at";

/// Raw values read directly from an `owned_decks` row.
pub struct RawOwnedDeck {
  pub id:          String,
  pub catalog_ref: String,
  pub deck_code:   String,
  pub label:       String,
  pub active:      bool,
  pub owner_ref:   Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawOwnedDeck {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      catalog_ref: row.get(1)?,
      deck_code:   row.get(2)?,
      label:       row.get(3)?,
      active:      row.get(4)?,
      owner_ref:   row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_deck(self) -> Result<OwnedDeck> {
    Ok(OwnedDeck {
      id:          self.id.into(),
      catalog_ref: self.catalog_ref.into(),
      deck_code:   self.deck_code,
      label:       self.label,
      active:      self.active,
      owner_ref:   self.owner_ref,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const MATCH_COLUMNS: &str = "id, date, match_type, rank, rank_group, owned_deck_ref, \
                                 turn, outcome, opponent_ref, season, created_at";

/// Raw values read directly from a `match_records` row.
pub struct RawMatchRecord {
  pub id:             String,
  pub date:           String,
  pub match_type:     String,
  pub rank:           String,
  pub rank_group:     String,
  pub owned_deck_ref: String,
  pub turn:           String,
  pub outcome:        String,
  pub opponent_ref:   String,
  pub season:         Option<u32>,
  pub created_at:     String,
}

impl RawMatchRecord {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      date:           row.get(1)?,
      match_type:     row.get(2)?,
      rank:           row.get(3)?,
      rank_group:     row.get(4)?,
      owned_deck_ref: row.get(5)?,
      turn:           row.get(6)?,
      outcome:        row.get(7)?,
      opponent_ref:   row.get(8)?,
      season:         row.get(9)?,
      created_at:     row.get(10)?,
    })
  }

  pub fn into_record(self) -> Result<MatchRecord> {
    Ok(MatchRecord {
      id:             self.id.into(),
      date:           decode_date(&self.date)?,
      match_type:     self.match_type.parse()?,
      rank:           self.rank.parse()?,
      group:          self.rank_group.parse()?,
      owned_deck_ref: self.owned_deck_ref.into(),
      turn:           self.turn.parse()?,
      outcome:        self.outcome.parse()?,
      opponent_ref:   self.opponent_ref.into(),
      season:         self.season,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}
