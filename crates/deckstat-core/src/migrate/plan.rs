//! Migration Planner.

use crate::{
  batch::MigrationBatch,
  integrity::{self, AcceptedRecord, IdSet},
  migrate::{Plan, PlanCounts, PlanReport, RecordRejection},
  store::LedgerStore,
  validate::{ValidationContext, raw_id, validate_record},
};

/// A batch after field validation, before integrity resolution.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
  pub batch_digest: String,
  pub counts:       PlanCounts,
  pub rejections:   Vec<RecordRejection>,
  pub accepted:     Vec<AcceptedRecord>,
}

/// Run the Entity Validator over every record of `batch`.
pub fn validate_batch(batch: &MigrationBatch, ctx: &ValidationContext) -> ValidatedBatch {
  let mut counts = PlanCounts::default();
  let mut rejections = Vec::new();
  let mut accepted = Vec::new();

  for (position, record) in batch.positioned() {
    let slot = counts.get_mut(position.kind);
    slot.submitted += 1;
    match validate_record(record.kind, &record.raw, ctx) {
      Ok(entity) => {
        slot.accepted += 1;
        accepted.push(AcceptedRecord { position, entity });
      }
      Err(violations) => {
        slot.rejected += 1;
        rejections.push(RecordRejection {
          position,
          id: raw_id(&record.raw),
          violations,
        });
      }
    }
  }

  ValidatedBatch { batch_digest: batch.digest(), counts, rejections, accepted }
}

impl ValidatedBatch {
  /// Ids the store must be asked about.
  pub fn probe(&self) -> IdSet { integrity::probe(&self.accepted) }

  /// Resolve against persisted ids and produce the final plan.
  pub fn plan(self, existing: &IdSet) -> Plan {
    let conflicts = integrity::resolve(&self.accepted, existing);
    let can_commit = self.rejections.is_empty() && conflicts.is_empty();
    Plan {
      report:   PlanReport {
        batch_digest: self.batch_digest,
        counts: self.counts,
        rejections: self.rejections,
        conflicts,
        can_commit,
      },
      accepted: self.accepted,
    }
  }
}

/// Validate and resolve `batch` against `existing` in one step.
pub fn plan(batch: &MigrationBatch, existing: &IdSet, ctx: &ValidationContext) -> Plan {
  validate_batch(batch, ctx).plan(existing)
}

/// Produce the plan report for `batch` against current storage. Never
/// writes.
pub async fn dry_run<S: LedgerStore>(
  store: &S,
  batch: &MigrationBatch,
) -> Result<PlanReport, S::Error> {
  let ctx = ValidationContext::new(batch.owner_ref.clone());
  let validated = validate_batch(batch, &ctx);
  let existing = store.existing_ids(validated.probe()).await?;
  let report = validated.plan(&existing).report;

  tracing::debug!(
    digest = %report.batch_digest,
    records = batch.len(),
    rejections = report.rejections.len(),
    conflicts = report.conflicts.len(),
    can_commit = report.can_commit,
    "planned migration batch"
  );

  Ok(report)
}
