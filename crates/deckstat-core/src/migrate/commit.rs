//! Migration Committer.

use crate::{
  batch::MigrationBatch,
  entity::Entity,
  integrity::AcceptedRecord,
  migrate::{
    CommitManifest, MigrationError, PlanReport, PreconditionFailure, dry_run,
    validate_batch,
  },
  store::{LedgerStore, UnitOfWork},
  validate::ValidationContext,
};

enum Applied {
  Committed(CommitManifest),
  Refused(PlanReport),
}

/// Commit `batch` atomically.
///
/// Without `confirm` this is a dry-run that reports through
/// [`PreconditionFailure::NotConfirmed`]. With `confirm`, the plan is
/// recomputed inside the store's unit of work, so it reflects storage as it
/// is at commit time rather than whenever the caller last dry-ran. A clean
/// plan is applied in dependency order; an unclean one is refused with
/// [`PreconditionFailure::NotCommittable`]. Any storage error rolls back the
/// whole unit.
pub async fn commit<S: LedgerStore>(
  store: &S,
  batch: &MigrationBatch,
  confirm: bool,
) -> Result<CommitManifest, MigrationError<S::Error>> {
  if !confirm {
    let report = dry_run(store, batch).await.map_err(MigrationError::Storage)?;
    return Err(MigrationError::Precondition {
      reason: PreconditionFailure::NotConfirmed,
      report: Box::new(report),
    });
  }

  let ctx = ValidationContext::new(batch.owner_ref.clone());
  let validated = validate_batch(batch, &ctx);

  let applied = store
    .atomically(move |uow| {
      let existing = uow.existing_ids(&validated.probe())?;
      let plan = validated.plan(&existing);
      if !plan.report.can_commit {
        return Ok(Applied::Refused(plan.report));
      }
      let manifest = apply(uow, plan.report.batch_digest, plan.accepted)?;
      Ok(Applied::Committed(manifest))
    })
    .await;

  match applied {
    Ok(Applied::Committed(manifest)) => {
      tracing::info!(
        digest = %manifest.batch_digest,
        catalog_entries = manifest.catalog_entries.len(),
        owned_decks = manifest.owned_decks.len(),
        match_records = manifest.match_records.len(),
        "migration committed"
      );
      Ok(manifest)
    }
    Ok(Applied::Refused(report)) => {
      tracing::warn!(
        digest = %report.batch_digest,
        rejections = report.rejections.len(),
        conflicts = report.conflicts.len(),
        "migration refused"
      );
      Err(MigrationError::Precondition {
        reason: PreconditionFailure::NotCommittable,
        report: Box::new(report),
      })
    }
    Err(err) => {
      tracing::warn!(error = %err, "migration rolled back");
      Err(MigrationError::Storage(err))
    }
  }
}

/// Insert every accepted record: catalog entries, then owned decks, then
/// match records. Within a kind, batch order is kept.
fn apply<E>(
  uow: &mut dyn UnitOfWork<Error = E>,
  batch_digest: String,
  mut accepted: Vec<AcceptedRecord>,
) -> Result<CommitManifest, E> {
  accepted.sort_by_key(|r| (r.position.kind, r.position.sequence));

  let mut manifest = CommitManifest { batch_digest, ..CommitManifest::default() };
  for record in accepted {
    match record.entity {
      Entity::CatalogEntry(entry) => {
        uow.insert_catalog_entry(&entry)?;
        manifest.catalog_entries.push(entry.id);
      }
      Entity::OwnedDeck(deck) => {
        uow.insert_owned_deck(&deck)?;
        manifest.owned_decks.push(deck.id);
      }
      Entity::MatchRecord(record) => {
        uow.insert_match_record(&record)?;
        manifest.match_records.push(record.id);
      }
    }
  }
  Ok(manifest)
}
