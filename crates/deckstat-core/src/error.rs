//! Error types for `deckstat-core`.

use thiserror::Error;

use crate::entity::{EntityKind, RecordId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("{kind} not found: {id}")]
  NotFound { kind: EntityKind, id: RecordId },

  /// A guarded delete was refused because other records still point at the
  /// target.
  #[error(
    "cannot delete {kind} {id}: referenced by {references} {referenced_by} record(s)"
  )]
  DeleteConstraint {
    kind:          EntityKind,
    id:            RecordId,
    references:    u64,
    referenced_by: EntityKind,
  },

  #[error("invalid date {0:?}: expected YYYY-MM-DD or YYYY/MM/DD")]
  InvalidDate(String),

  #[error("unknown {vocabulary} value: {value:?}")]
  UnknownValue {
    vocabulary: &'static str,
    value:      String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
