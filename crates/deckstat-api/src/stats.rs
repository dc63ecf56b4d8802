//! Handler for `GET /stats`.
//!
//! Query params: `start_date`, `end_date` (inclusive, `YYYY-MM-DD` or
//! `YYYY/MM/DD`), `season`, `match_type`.

use std::sync::Arc;

use axum::{Json, extract::State};
use deckstat_core::{
  stats::{self, RawStatsFilter, Statistics, StatsFilter},
  store::LedgerStore,
};

use crate::{error::ApiError, extract::Params};

/// Parse a raw filter, mapping bad dates and unknown match types to 400.
pub(crate) fn parse_filter(raw: RawStatsFilter) -> Result<StatsFilter, ApiError> {
  StatsFilter::try_from(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// `GET /stats[?start_date=...][&end_date=...][&season=...][&match_type=...]`
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Params(params): Params<RawStatsFilter>,
) -> Result<Json<Statistics>, ApiError>
where
  S: LedgerStore,
{
  let filter = parse_filter(params)?;
  let statistics = stats::statistics(&*store, &filter)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(statistics))
}
