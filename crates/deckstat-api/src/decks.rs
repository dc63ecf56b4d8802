//! Handlers for `/decks` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/decks` | Optional `?active_only=true` |
//! | `POST`   | `/decks` | Body: one raw owned deck; 201 + stored deck |
//! | `GET`    | `/decks/:id` | 404 if not found |
//! | `DELETE` | `/decks/:id` | 409 while matches reference it |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use deckstat_core::{
  entity::{EntityKind, OwnedDeck, RecordId},
  store::LedgerStore,
};
use serde::Deserialize;
use serde_json::Value;

use crate::{
  error::ApiError,
  extract::{Params, Payload},
  migrations::create_one,
};

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub active_only: bool,
}

/// `GET /decks[?active_only=true]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Params(params): Params<ListParams>,
) -> Result<Json<Vec<OwnedDeck>>, ApiError>
where
  S: LedgerStore,
{
  let decks = store
    .list_owned_decks(params.active_only)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(decks))
}

/// `POST /decks`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Payload(body): Payload<Value>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  let id = create_one(&*store, EntityKind::OwnedDeck, body).await?;
  let deck = fetch(&*store, id).await?;
  Ok((StatusCode::CREATED, Json(deck)))
}

/// `GET /decks/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<Json<OwnedDeck>, ApiError>
where
  S: LedgerStore,
{
  Ok(Json(fetch(&*store, id.into()).await?))
}

/// `DELETE /decks/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: LedgerStore,
{
  store.delete_owned_deck(id.into()).await.map_err(ApiError::from_store)?;
  Ok(StatusCode::NO_CONTENT)
}

async fn fetch<S: LedgerStore>(store: &S, id: RecordId) -> Result<OwnedDeck, ApiError> {
  store
    .get_owned_deck(id.clone())
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("owned deck {id} not found")))
}
