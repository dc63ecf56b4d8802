//! Handlers for `/matches` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/matches` | Same filters as `/stats`; ordered by date then creation |
//! | `POST` | `/matches` | Body: one raw match record; 201 + stored record |
//! | `GET`  | `/matches/:id` | 404 if not found |
//!
//! Match records are never deleted through the API.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use deckstat_core::{
  entity::{EntityKind, MatchRecord, RecordId},
  stats::RawStatsFilter,
  store::LedgerStore,
};
use serde_json::Value;

use crate::{
  error::ApiError,
  extract::{Params, Payload},
  migrations::create_one,
  stats::parse_filter,
};

/// `GET /matches[?start_date=...][&end_date=...][&season=...][&match_type=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Params(params): Params<RawStatsFilter>,
) -> Result<Json<Vec<MatchRecord>>, ApiError>
where
  S: LedgerStore,
{
  let filter = parse_filter(params)?;
  let records = store.match_records(&filter).await.map_err(ApiError::from_store)?;
  Ok(Json(records))
}

/// `POST /matches`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Payload(body): Payload<Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  let id = create_one(&*store, EntityKind::MatchRecord, body).await?;
  let record = fetch(&*store, id).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

/// `GET /matches/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<MatchRecord>, ApiError>
where
  S: LedgerStore,
{
  Ok(Json(fetch(&*store, id.into()).await?))
}

async fn fetch<S: LedgerStore>(store: &S, id: RecordId) -> Result<MatchRecord, ApiError> {
  store
    .get_match_record(id.clone())
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("match record {id} not found")))
}
