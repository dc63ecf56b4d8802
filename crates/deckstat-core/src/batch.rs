//! Inbound migration batches.
//!
//! A batch arrives in one of two JSON shapes:
//!
//! ```json
//! { "catalogEntries": [..], "ownedDecks": [..], "matchRecords": [..], "ownerRef": "u1" }
//! { "records": [{ "kind": "owned_deck", "id": "d1", .. }, ..], "ownerRef": "u1" }
//! ```
//!
//! Both are flattened into one ordered sequence of [`BatchRecord`]s. In the
//! first shape the sequence is catalog entries, then owned decks, then match
//! records; in the second it is exactly the caller's order. If both are
//! present the typed arrays come first. Sequence order is what the integrity
//! resolver uses to decide whether a reference points backwards or forwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::entity::EntityKind;

// ─── Batch ───────────────────────────────────────────────────────────────────

/// An ordered, untrusted batch of raw records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireBatch", into = "WireBatch")]
pub struct MigrationBatch {
  pub records:   Vec<BatchRecord>,
  /// Owner applied to owned decks that do not name one.
  pub owner_ref: Option<String>,
}

/// One raw inbound record, tagged with the kind it claims to be.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
  pub kind: EntityKind,
  pub raw:  Value,
}

/// Where a record sits in its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
  pub kind:     EntityKind,
  /// Zero-based index among records of the same kind.
  pub index:    usize,
  /// Zero-based index in the whole batch sequence.
  pub sequence: usize,
}

impl MigrationBatch {
  pub fn new(owner_ref: Option<String>) -> Self {
    Self { records: Vec::new(), owner_ref }
  }

  /// A batch holding exactly one record.
  pub fn single(kind: EntityKind, raw: Value) -> Self {
    let mut batch = Self::default();
    batch.push(kind, raw);
    batch
  }

  pub fn push(&mut self, kind: EntityKind, raw: Value) {
    self.records.push(BatchRecord { kind, raw });
  }

  pub fn len(&self) -> usize { self.records.len() }

  pub fn is_empty(&self) -> bool { self.records.is_empty() }

  /// Records with their batch positions, in sequence order.
  pub fn positioned(&self) -> impl Iterator<Item = (Position, &BatchRecord)> {
    let mut per_kind = [0usize; 3];
    self.records.iter().enumerate().map(move |(sequence, record)| {
      let slot = &mut per_kind[kind_slot(record.kind)];
      let position = Position { kind: record.kind, index: *slot, sequence };
      *slot += 1;
      (position, record)
    })
  }

  /// Hex SHA-256 over a canonical rendering of the batch.
  ///
  /// Object keys serialise in sorted order, so two batches with the same
  /// records in the same sequence share a digest regardless of key order.
  pub fn digest(&self) -> String {
    let canonical = json!({
      "owner_ref": self.owner_ref,
      "records": self
        .records
        .iter()
        .map(|r| json!([r.kind, r.raw]))
        .collect::<Vec<_>>(),
    });
    let hash = Sha256::digest(canonical.to_string().as_bytes());
    hex::encode(hash)
  }
}

fn kind_slot(kind: EntityKind) -> usize {
  match kind {
    EntityKind::CatalogEntry => 0,
    EntityKind::OwnedDeck => 1,
    EntityKind::MatchRecord => 2,
  }
}

// ─── Wire shape ──────────────────────────────────────────────────────────────

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBatch {
  #[serde(default, alias = "catalog_entries", skip_serializing_if = "Vec::is_empty")]
  catalog_entries: Vec<Value>,
  #[serde(default, alias = "owned_decks", skip_serializing_if = "Vec::is_empty")]
  owned_decks:     Vec<Value>,
  #[serde(default, alias = "match_records", skip_serializing_if = "Vec::is_empty")]
  match_records:   Vec<Value>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  records:         Vec<WireRecord>,
  #[serde(default, alias = "owner_ref", skip_serializing_if = "Option::is_none")]
  owner_ref:       Option<String>,
}

#[derive(Serialize, Deserialize)]
struct WireRecord {
  kind:   EntityKind,
  #[serde(flatten)]
  fields: Map<String, Value>,
}

impl From<WireBatch> for MigrationBatch {
  fn from(wire: WireBatch) -> Self {
    let mut batch = MigrationBatch::new(wire.owner_ref);
    for raw in wire.catalog_entries {
      batch.push(EntityKind::CatalogEntry, raw);
    }
    for raw in wire.owned_decks {
      batch.push(EntityKind::OwnedDeck, raw);
    }
    for raw in wire.match_records {
      batch.push(EntityKind::MatchRecord, raw);
    }
    for record in wire.records {
      batch.push(record.kind, Value::Object(record.fields));
    }
    batch
  }
}

impl From<MigrationBatch> for WireBatch {
  fn from(batch: MigrationBatch) -> Self {
    let records = batch
      .records
      .into_iter()
      .map(|record| {
        let fields = match record.raw {
          Value::Object(map) => map,
          other => Map::from_iter([("value".to_owned(), other)]),
        };
        WireRecord { kind: record.kind, fields }
      })
      .collect();
    WireBatch { records, owner_ref: batch.owner_ref, ..WireBatch::default() }
  }
}
