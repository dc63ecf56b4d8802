//! The three persisted entity kinds and their shared identifier type.
//!
//! The hierarchy is strict: catalog entries are referenced by owned decks
//! and match records; owned decks are referenced by match records.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::vocab::{CardClass, MatchType, Outcome, Rank, RankGroup, Turn};

// ─── Identity ────────────────────────────────────────────────────────────────

/// A caller-assigned identifier, unique within its entity kind.
///
/// Legacy records carry their own keys, so identifiers are opaque strings
/// rather than server-generated UUIDs.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for RecordId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for RecordId {
  fn from(s: String) -> Self { Self(s) }
}

/// Discriminates the three entity kinds.
///
/// The declaration order is the dependency order used when inserting.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
  #[serde(alias = "catalogEntry")]
  CatalogEntry,
  #[serde(alias = "ownedDeck")]
  OwnedDeck,
  #[serde(alias = "matchRecord")]
  MatchRecord,
}

impl EntityKind {
  pub const ALL: &'static [Self] =
    &[Self::CatalogEntry, Self::OwnedDeck, Self::MatchRecord];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::CatalogEntry => "catalog_entry",
      Self::OwnedDeck => "owned_deck",
      Self::MatchRecord => "match_record",
    }
  }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// A known deck archetype, usable as an opponent reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckCatalogEntry {
  pub id:            RecordId,
  pub class:         CardClass,
  pub label:         String,
  /// Display order; not required to be unique.
  pub sort_position: u32,
}

/// A deck the local user plays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedDeck {
  pub id:          RecordId,
  pub catalog_ref: RecordId,
  /// Opaque in-game deck code; no format is imposed.
  pub deck_code:   String,
  pub label:       String,
  pub active:      bool,
  /// Nullable until multi-user support lands.
  pub owner_ref:   Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// One recorded game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
  pub id:             RecordId,
  /// Serialised as canonical `YYYY-MM-DD`.
  pub date:           NaiveDate,
  pub match_type:     MatchType,
  pub rank:           Rank,
  pub group:          RankGroup,
  pub owned_deck_ref: RecordId,
  pub turn:           Turn,
  pub outcome:        Outcome,
  pub opponent_ref:   RecordId,
  pub season:         Option<u32>,
  /// Tie-break sort key among matches on the same date.
  pub created_at:     DateTime<Utc>,
}

/// A typed record of any kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
  CatalogEntry(DeckCatalogEntry),
  OwnedDeck(OwnedDeck),
  MatchRecord(MatchRecord),
}

/// An outgoing foreign key: the field it lives in, the kind it targets, and
/// the referenced identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference<'a> {
  pub field:  &'static str,
  pub target: EntityKind,
  pub id:     &'a RecordId,
}

impl Entity {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::CatalogEntry(_) => EntityKind::CatalogEntry,
      Self::OwnedDeck(_) => EntityKind::OwnedDeck,
      Self::MatchRecord(_) => EntityKind::MatchRecord,
    }
  }

  pub fn id(&self) -> &RecordId {
    match self {
      Self::CatalogEntry(e) => &e.id,
      Self::OwnedDeck(d) => &d.id,
      Self::MatchRecord(m) => &m.id,
    }
  }

  /// Every foreign key this record carries.
  pub fn references(&self) -> Vec<Reference<'_>> {
    match self {
      Self::CatalogEntry(_) => Vec::new(),
      Self::OwnedDeck(d) => vec![Reference {
        field:  "catalog_ref",
        target: EntityKind::CatalogEntry,
        id:     &d.catalog_ref,
      }],
      Self::MatchRecord(m) => vec![
        Reference {
          field:  "owned_deck_ref",
          target: EntityKind::OwnedDeck,
          id:     &m.owned_deck_ref,
        },
        Reference {
          field:  "opponent_ref",
          target: EntityKind::CatalogEntry,
          id:     &m.opponent_ref,
        },
      ],
    }
  }
}
