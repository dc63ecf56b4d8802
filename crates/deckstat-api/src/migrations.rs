//! Handlers for `/migrations` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/migrations/dry-run` | Body: a migration batch; returns the plan report |
//! | `POST` | `/migrations/commit` | Body: a batch plus `"confirm": true`; 201 + manifest |
//!
//! A body that is not a batch answers 400. A refused commit answers 422 with
//! the plan report. A storage failure answers an opaque 500; nothing was
//! written and the request may be retried.

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use deckstat_core::{
  batch::MigrationBatch,
  entity::{EntityKind, RecordId},
  migrate::{self, PlanReport},
  store::LedgerStore,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{Limits, error::ApiError, extract::Payload};

fn check_size(batch: &MigrationBatch, limits: Limits) -> Result<(), ApiError> {
  if batch.len() > limits.max_batch_records {
    return Err(ApiError::PayloadTooLarge(format!(
      "batch has {} records; the limit is {}",
      batch.len(),
      limits.max_batch_records
    )));
  }
  Ok(())
}

// ─── Dry-run ─────────────────────────────────────────────────────────────────

/// `POST /migrations/dry-run`
pub async fn dry_run<S>(
  State(store): State<Arc<S>>,
  State(limits): State<Limits>,
  Payload(batch): Payload<MigrationBatch>,
) -> Result<Json<PlanReport>, ApiError>
where
  S: LedgerStore,
{
  check_size(&batch, limits)?;
  let report = migrate::dry_run(&*store, &batch).await.map_err(ApiError::from_store)?;
  Ok(Json(report))
}

// ─── Commit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CommitBody {
  #[serde(flatten)]
  pub batch:   MigrationBatch,
  /// Must be `true` for anything to be written.
  #[serde(default)]
  pub confirm: bool,
}

/// `POST /migrations/commit`
pub async fn commit<S>(
  State(store): State<Arc<S>>,
  State(limits): State<Limits>,
  Payload(body): Payload<CommitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  check_size(&body.batch, limits)?;
  let manifest = migrate::commit(&*store, &body.batch, body.confirm).await?;
  Ok((StatusCode::CREATED, Json(manifest)))
}

// ─── Single-record creation ──────────────────────────────────────────────────

/// Create one record through the same validation and integrity checks as a
/// migration, returning its identifier.
pub(crate) async fn create_one<S>(store: &S, kind: EntityKind, raw: Value) -> Result<RecordId, ApiError>
where
  S: LedgerStore,
{
  let batch = MigrationBatch::single(kind, raw);
  let manifest = migrate::commit(store, &batch, true).await?;
  manifest
    .ids(kind)
    .first()
    .cloned()
    .ok_or_else(|| ApiError::BadRequest(format!("no {kind} was created")))
}
