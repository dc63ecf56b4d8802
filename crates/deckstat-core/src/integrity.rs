//! Integrity Resolver: cross-record checks over a whole validated batch.
//!
//! A reference resolves if its target is already persisted or was accepted
//! earlier in the same batch sequence. A reference to a record that appears
//! later in the batch is a forward reference; it is reported, not retried.
//! Nothing here touches storage: persisted state comes in as an [`IdSet`].

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
  batch::Position,
  entity::{Entity, EntityKind, RecordId},
};

// ─── Id sets ─────────────────────────────────────────────────────────────────

/// Identifiers grouped by entity kind.
///
/// Used both as a probe (which ids does a batch mention?) and as the store's
/// answer (which of those already exist?).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdSet {
  pub catalog_entries: BTreeSet<RecordId>,
  pub owned_decks:     BTreeSet<RecordId>,
  pub match_records:   BTreeSet<RecordId>,
}

impl IdSet {
  pub fn get(&self, kind: EntityKind) -> &BTreeSet<RecordId> {
    match kind {
      EntityKind::CatalogEntry => &self.catalog_entries,
      EntityKind::OwnedDeck => &self.owned_decks,
      EntityKind::MatchRecord => &self.match_records,
    }
  }

  fn get_mut(&mut self, kind: EntityKind) -> &mut BTreeSet<RecordId> {
    match kind {
      EntityKind::CatalogEntry => &mut self.catalog_entries,
      EntityKind::OwnedDeck => &mut self.owned_decks,
      EntityKind::MatchRecord => &mut self.match_records,
    }
  }

  pub fn insert(&mut self, kind: EntityKind, id: RecordId) -> bool {
    self.get_mut(kind).insert(id)
  }

  pub fn contains(&self, kind: EntityKind, id: &RecordId) -> bool {
    self.get(kind).contains(id)
  }

  pub fn len(&self) -> usize {
    self.catalog_entries.len() + self.owned_decks.len() + self.match_records.len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

// ─── Conflicts ───────────────────────────────────────────────────────────────

/// A record that passed field validation but cannot land consistently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "conflict", rename_all = "snake_case")]
pub enum IntegrityConflict {
  /// A foreign key names nothing persisted and nothing earlier in the batch.
  UnresolvedReference {
    position:  Position,
    id:        RecordId,
    field:     String,
    target:    EntityKind,
    reference: RecordId,
    /// The target does appear, but later in the batch.
    forward:   bool,
  },
  /// The same identifier was already accepted earlier in this batch.
  DuplicateInBatch {
    position: Position,
    id:       RecordId,
    first:    Position,
  },
  /// The identifier already exists in storage.
  AlreadyPersisted { position: Position, id: RecordId },
}

impl IntegrityConflict {
  pub fn position(&self) -> Position {
    match self {
      Self::UnresolvedReference { position, .. }
      | Self::DuplicateInBatch { position, .. }
      | Self::AlreadyPersisted { position, .. } => *position,
    }
  }
}

/// A record that passed field validation, with its batch position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedRecord {
  pub position: Position,
  pub entity:   Entity,
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Every id declared or referenced by `accepted`; the store is asked which
/// of these already exist.
pub fn probe(accepted: &[AcceptedRecord]) -> IdSet {
  let mut ids = IdSet::default();
  for record in accepted {
    ids.insert(record.entity.kind(), record.entity.id().clone());
    for reference in record.entity.references() {
      ids.insert(reference.target, reference.id.clone());
    }
  }
  ids
}

/// Check `accepted` (in sequence order) against `existing`.
pub fn resolve(accepted: &[AcceptedRecord], existing: &IdSet) -> Vec<IntegrityConflict> {
  let mut declared = IdSet::default();
  for record in accepted {
    declared.insert(record.entity.kind(), record.entity.id().clone());
  }

  let mut seen: HashMap<(EntityKind, &RecordId), Position> = HashMap::new();
  let mut conflicts = Vec::new();

  for record in accepted {
    let entity = &record.entity;

    for reference in entity.references() {
      let resolved = existing.contains(reference.target, reference.id)
        || seen.contains_key(&(reference.target, reference.id));
      if !resolved {
        conflicts.push(IntegrityConflict::UnresolvedReference {
          position:  record.position,
          id:        entity.id().clone(),
          field:     reference.field.to_owned(),
          target:    reference.target,
          reference: reference.id.clone(),
          forward:   declared.contains(reference.target, reference.id),
        });
      }
    }

    let key = (entity.kind(), entity.id());
    if existing.contains(entity.kind(), entity.id()) {
      conflicts.push(IntegrityConflict::AlreadyPersisted {
        position: record.position,
        id:       entity.id().clone(),
      });
    } else if let Some(first) = seen.get(&key) {
      conflicts.push(IntegrityConflict::DuplicateInBatch {
        position: record.position,
        id:       entity.id().clone(),
        first:    *first,
      });
    } else {
      seen.insert(key, record.position);
    }
  }

  conflicts
}
