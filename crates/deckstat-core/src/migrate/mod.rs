//! Two-phase migration: plan (dry-run), then commit.
//!
//! [`dry_run`] validates a batch and checks it against persisted state
//! without writing anything. [`commit`] re-runs the same plan inside one
//! unit of work and applies it only if the plan is clean. There is no
//! partial mode: one rejected record or one integrity conflict blocks the
//! whole batch.

mod commit;
mod plan;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
  batch::Position,
  entity::{EntityKind, RecordId},
  integrity::{AcceptedRecord, IntegrityConflict},
  validate::FieldViolation,
};

pub use commit::commit;
pub use plan::{ValidatedBatch, dry_run, plan, validate_batch};

// ─── Report ──────────────────────────────────────────────────────────────────

/// Per-kind record counts in a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
  pub submitted: usize,
  pub accepted:  usize,
  pub rejected:  usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanCounts {
  pub catalog_entries: KindCounts,
  pub owned_decks:     KindCounts,
  pub match_records:   KindCounts,
}

impl PlanCounts {
  pub fn get(&self, kind: EntityKind) -> KindCounts {
    match kind {
      EntityKind::CatalogEntry => self.catalog_entries,
      EntityKind::OwnedDeck => self.owned_decks,
      EntityKind::MatchRecord => self.match_records,
    }
  }

  fn get_mut(&mut self, kind: EntityKind) -> &mut KindCounts {
    match kind {
      EntityKind::CatalogEntry => &mut self.catalog_entries,
      EntityKind::OwnedDeck => &mut self.owned_decks,
      EntityKind::MatchRecord => &mut self.match_records,
    }
  }
}

/// A record that failed field validation, with every violation found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRejection {
  pub position:   Position,
  /// The record's `id`, if one could be read at all.
  pub id:         Option<String>,
  pub violations: Vec<FieldViolation>,
}

/// The dry-run output, and the body of every refused commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReport {
  /// Fingerprint of the submitted batch; see
  /// [`MigrationBatch::digest`](crate::batch::MigrationBatch::digest).
  pub batch_digest: String,
  pub counts:       PlanCounts,
  pub rejections:   Vec<RecordRejection>,
  pub conflicts:    Vec<IntegrityConflict>,
  pub can_commit:   bool,
}

/// A report plus the typed records it accepted.
#[derive(Debug, Clone)]
pub struct Plan {
  pub report:   PlanReport,
  pub accepted: Vec<AcceptedRecord>,
}

// ─── Manifest ────────────────────────────────────────────────────────────────

/// Identifiers created by a successful commit, per kind, in batch order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitManifest {
  pub batch_digest:    String,
  pub catalog_entries: Vec<RecordId>,
  pub owned_decks:     Vec<RecordId>,
  pub match_records:   Vec<RecordId>,
}

impl CommitManifest {
  pub fn ids(&self, kind: EntityKind) -> &[RecordId] {
    match kind {
      EntityKind::CatalogEntry => &self.catalog_entries,
      EntityKind::OwnedDeck => &self.owned_decks,
      EntityKind::MatchRecord => &self.match_records,
    }
  }

  pub fn total(&self) -> usize {
    self.catalog_entries.len() + self.owned_decks.len() + self.match_records.len()
  }
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Why a commit was refused before touching storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreconditionFailure {
  /// The caller did not set the confirmation flag.
  NotConfirmed,
  /// The plan, recomputed against current storage, has rejections or
  /// conflicts.
  NotCommittable,
}

impl fmt::Display for PreconditionFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::NotConfirmed => f.write_str("commit was not confirmed"),
      Self::NotCommittable => f.write_str("batch is not committable"),
    }
  }
}

/// A commit that did not happen. Storage is unchanged in every variant.
///
/// Field violations and integrity conflicts are carried inside the report
/// of a [`MigrationError::Precondition`]; the caller fixes the data and
/// resubmits. A [`MigrationError::Storage`] is opaque and safe to retry.
#[derive(Debug, Error)]
pub enum MigrationError<E>
where
  E: std::error::Error + 'static,
{
  #[error("migration not applied: {reason}")]
  Precondition {
    reason: PreconditionFailure,
    report: Box<PlanReport>,
  },

  #[error("storage failure during migration; no records were written")]
  Storage(#[source] E),
}

impl<E> MigrationError<E>
where
  E: std::error::Error + 'static,
{
  /// The plan report, for precondition failures.
  pub fn report(&self) -> Option<&PlanReport> {
    match self {
      Self::Precondition { report, .. } => Some(report),
      Self::Storage(_) => None,
    }
  }
}
