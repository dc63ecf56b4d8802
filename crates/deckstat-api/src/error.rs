//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use deckstat_core::{
  migrate::{MigrationError, PlanReport, PreconditionFailure},
  store::AsCoreError,
};
use serde_json::json;
use thiserror::Error;

/// Body of every 500 not caused by a migration. The cause is only logged.
pub const STORE_FAILURE: &str = "internal storage error";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("payload too large: {0}")]
  PayloadTooLarge(String),

  /// A migration refused before storage was touched. The report says why.
  #[error("migration not applied: {reason}")]
  Rejected {
    reason: PreconditionFailure,
    report: Box<PlanReport>,
  },

  /// A migration rolled back. Details are logged, not returned.
  #[error("storage failure during migration; no records were written")]
  Storage,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store error, surfacing missing records and refused deletes.
  pub fn from_store<E>(e: E) -> Self
  where
    E: std::error::Error + AsCoreError + Send + Sync + 'static,
  {
    match e.as_core() {
      Some(core @ deckstat_core::Error::NotFound { .. }) => {
        return Self::NotFound(core.to_string());
      }
      Some(core @ deckstat_core::Error::DeleteConstraint { .. }) => {
        return Self::Conflict(core.to_string());
      }
      _ => {}
    }
    Self::Store(Box::new(e))
  }
}

impl<E> From<MigrationError<E>> for ApiError
where
  E: std::error::Error + Send + Sync + 'static,
{
  fn from(e: MigrationError<E>) -> Self {
    match e {
      MigrationError::Precondition { reason, report } => Self::Rejected { reason, report },
      MigrationError::Storage(source) => {
        tracing::error!(error = %source, "migration storage failure");
        Self::Storage
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let message = self.to_string();
    let (status, body) = match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, json!({ "error": m })),
      ApiError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": m })),
      ApiError::Rejected { reason, report } => (
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": message, "reason": reason, "report": report }),
      ),
      ApiError::Storage => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message })),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": STORE_FAILURE }))
      }
    };
    (status, Json(body)).into_response()
  }
}
