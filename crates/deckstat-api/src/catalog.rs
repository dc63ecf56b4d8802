//! Handlers for `/catalog` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/catalog` | Ordered by `sort_position` |
//! | `POST`   | `/catalog` | Body: one raw catalog entry; 201 + stored entry |
//! | `GET`    | `/catalog/:id` | 404 if not found |
//! | `DELETE` | `/catalog/:id` | 409 while decks or matches reference it |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use deckstat_core::{
  entity::{DeckCatalogEntry, EntityKind, RecordId},
  store::LedgerStore,
};
use serde_json::Value;

use crate::{error::ApiError, extract::Payload, migrations::create_one};

/// `GET /catalog`
pub async fn list<S>(State(store): State<Arc<S>>) -> Result<Json<Vec<DeckCatalogEntry>>, ApiError>
where
  S: LedgerStore,
{
  let entries = store.list_catalog_entries().await.map_err(ApiError::from_store)?;
  Ok(Json(entries))
}

/// `POST /catalog`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Payload(body): Payload<Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  let id = create_one(&*store, EntityKind::CatalogEntry, body).await?;
  let entry = fetch(&*store, id).await?;
  Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /catalog/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<DeckCatalogEntry>, ApiError>
where
  S: LedgerStore,
{
  Ok(Json(fetch(&*store, id.into()).await?))
}

/// `DELETE /catalog/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: LedgerStore,
{
  store.delete_catalog_entry(id.into()).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn fetch<S: LedgerStore>(store: &S, id: RecordId) -> Result<DeckCatalogEntry, ApiError> {
  store
    .get_catalog_entry(id.clone())
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("catalog entry {id} not found")))
}
