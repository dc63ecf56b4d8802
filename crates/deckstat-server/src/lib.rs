//! HTTP application assembly for the deckstat server.
//!
//! Mounts the JSON API under `/api`, adds `/health`, and wraps everything in
//! request tracing and a body-size limit.

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::{DefaultBodyLimit, State},
  routing::get,
};
use deckstat_api::{ApiError, Limits};
use deckstat_core::store::{EntityCounts, LedgerStore};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DECKSTAT_*` environment variables. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:              String,
  pub port:              u16,
  pub store_path:        PathBuf,
  /// Largest request body accepted, in bytes.
  pub max_body_bytes:    usize,
  /// Largest number of records accepted in one migration batch.
  pub max_batch_records: usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:              "127.0.0.1".to_owned(),
      port:              8080,
      store_path:        PathBuf::from("deckstat.sqlite3"),
      max_body_bytes:    16 * 1024 * 1024,
      max_batch_records: Limits::default().max_batch_records,
    }
  }
}

impl ServerConfig {
  pub fn limits(&self) -> Limits { Limits { max_batch_records: self.max_batch_records } }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Health {
  status: &'static str,
  counts: EntityCounts,
}

/// `GET /health`
async fn health<S>(State(store): State<Arc<S>>) -> Result<Json<Health>, ApiError>
where
  S: LedgerStore,
{
  let counts = store.counts().await.map_err(ApiError::from_store)?;
  Ok(Json(Health { status: "ok", counts }))
}

/// Build the full application router for `store`.
pub fn app<S>(store: Arc<S>, config: &ServerConfig) -> Router
where
  S: LedgerStore + 'static,
{
  Router::new()
    .route("/health", get(health::<S>))
    .with_state(Arc::clone(&store))
    .nest("/api", deckstat_api::api_router(store, config.limits()))
    .layer(DefaultBodyLimit::max(config.max_body_bytes))
    .layer(TraceLayer::new_for_http())
}
