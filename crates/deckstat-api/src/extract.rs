//! Extractors whose rejections are reported as [`ApiError`] JSON bodies.
//!
//! axum's own `Json` and `Query` answer malformed input with plain text
//! (and a 422 for JSON that parses but does not fit the type). Here every
//! malformed envelope is a 400 `{"error": ...}`, which keeps 422 for batches
//! that were read fine but refused on their data.

use axum::{
  extract::{FromRequest, FromRequestParts},
  http::StatusCode,
};

use crate::error::ApiError;

/// JSON request body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Payload<T>(pub T);

/// Query string parameters.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Params<T>(pub T);

impl From<axum::extract::rejection::JsonRejection> for ApiError {
  fn from(rejection: axum::extract::rejection::JsonRejection) -> Self {
    // Body limit overruns keep their 413.
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
      return Self::PayloadTooLarge(rejection.body_text());
    }
    Self::BadRequest(rejection.body_text())
  }
}

impl From<axum::extract::rejection::QueryRejection> for ApiError {
  fn from(rejection: axum::extract::rejection::QueryRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}
