//! JSON REST API for deckstat.
//!
//! Exposes an axum [`Router`] backed by any [`deckstat_core::store::LedgerStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", deckstat_api::api_router(store.clone(), Limits::default()))
//! ```

pub mod catalog;
pub mod decks;
pub mod error;
pub mod extract;
pub mod matches;
pub mod migrations;
pub mod stats;

use std::sync::Arc;

use axum::{
  Router,
  extract::FromRef,
  routing::{get, post},
};
use deckstat_core::store::LedgerStore;

pub use error::ApiError;

// ─── State ───────────────────────────────────────────────────────────────────

/// Request-size limits enforced by the handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
  /// Largest number of records accepted in one migration batch.
  pub max_batch_records: usize,
}

impl Default for Limits {
  fn default() -> Self { Self { max_batch_records: 10_000 } }
}

/// Shared state threaded through all handlers. Handlers extract the parts
/// they need via [`FromRef`].
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub limits: Limits,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store), limits: self.limits } }
}

impl<S> FromRef<ApiState<S>> for Arc<S> {
  fn from_ref(state: &ApiState<S>) -> Self { Arc::clone(&state.store) }
}

impl<S> FromRef<ApiState<S>> for Limits {
  fn from_ref(state: &ApiState<S>) -> Self { state.limits }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, limits: Limits) -> Router<()>
where
  S: LedgerStore + 'static,
{
  Router::new()
    // Migration
    .route("/migrations/dry-run", post(migrations::dry_run::<S>))
    .route("/migrations/commit", post(migrations::commit::<S>))
    // Statistics
    .route("/stats", get(stats::handler::<S>))
    // Catalog entries
    .route("/catalog", get(catalog::list::<S>).post(catalog::create::<S>))
    .route("/catalog/{id}", get(catalog::get_one::<S>).delete(catalog::delete_one::<S>))
    // Owned decks
    .route("/decks", get(decks::list::<S>).post(decks::create::<S>))
    .route("/decks/{id}", get(decks::get_one::<S>).delete(decks::delete_one::<S>))
    // Match records
    .route("/matches", get(matches::list::<S>).post(matches::create::<S>))
    .route("/matches/{id}", get(matches::get_one::<S>))
    .with_state(ApiState { store, limits })
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use deckstat_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  use super::*;

  async fn app_with(limits: Limits) -> Router {
    let store = SqliteStore::open_in_memory().await.unwrap();
    api_router(Arc::new(store), limits)
  }

  async fn app() -> Router { app_with(Limits::default()).await }

  async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(body) => builder
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
  }

  fn snapshot() -> Value {
    json!({
      "catalogEntries": [
        { "id": "opp", "class": "havencraft", "label": "Ward Haven", "sort_position": 2 },
        { "id": "mine", "class": "runecraft", "label": "Spellboost Rune", "sort_position": 1 },
      ],
      "ownedDecks": [
        { "id": "d1", "catalogRef": "mine", "deckCode": "AAEB", "label": "Ladder list" },
      ],
      "matchRecords": [
        { "id": "m1", "date": "2025/01/26", "matchType": "ranked", "rank": "master",
          "group": "ruby", "ownedDeckRef": "d1", "turn": "first", "outcome": "win",
          "opponentRef": "opp" },
        { "id": "m2", "date": "2025-01-27", "matchType": "ranked", "rank": "master",
          "group": "ruby", "ownedDeckRef": "d1", "turn": "second", "outcome": "loss",
          "opponentRef": "opp" },
      ],
    })
  }

  fn confirmed(mut batch: Value) -> Value {
    batch["confirm"] = json!(true);
    batch
  }

  // ── Migrations ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn dry_run_reports_without_writing() {
    let app = app().await;
    let (status, report) = send(&app, "POST", "/migrations/dry-run", Some(snapshot())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["can_commit"], json!(true));
    assert_eq!(report["counts"]["match_records"]["accepted"], json!(2));

    let (_, list) = send(&app, "GET", "/catalog", None).await;
    assert_eq!(list, json!([]));
  }

  #[tokio::test]
  async fn commit_requires_confirmation() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/migrations/commit", Some(snapshot())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["reason"], json!("not_confirmed"));
    assert_eq!(body["report"]["can_commit"], json!(true));
  }

  #[tokio::test]
  async fn confirmed_commit_returns_manifest() {
    let app = app().await;
    let (status, manifest) =
      send(&app, "POST", "/migrations/commit", Some(confirmed(snapshot()))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(manifest["catalog_entries"], json!(["opp", "mine"]));
    assert_eq!(manifest["match_records"], json!(["m1", "m2"]));

    let (status, body) =
      send(&app, "POST", "/migrations/commit", Some(confirmed(snapshot()))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["reason"], json!("not_committable"));
  }

  #[tokio::test]
  async fn oversized_batch_is_refused() {
    let app = app_with(Limits { max_batch_records: 3 }).await;
    let (status, _) = send(&app, "POST", "/migrations/dry-run", Some(snapshot())).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
  }

  #[tokio::test]
  async fn malformed_batches_are_bad_requests() {
    let app = app().await;
    let bodies = [
      json!({ "records": [{ "kind": "bogus", "id": "x" }] }),
      json!({ "catalogEntries": "nope" }),
      json!({ "records": [5] }),
    ];
    for body in bodies {
      for uri in ["/migrations/dry-run", "/migrations/commit"] {
        let (status, resp) = send(&app, "POST", uri, Some(body.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
        assert!(resp["error"].is_string(), "{uri} {body}");
        assert!(resp.get("report").is_none());
      }
    }
  }

  #[tokio::test]
  async fn non_json_record_body_is_a_bad_request() {
    let app = app().await;
    let req = Request::builder()
      .method("POST")
      .uri("/catalog")
      .header("content-type", "application/json")
      .body(Body::from("{not json"))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
  }

  // ── Storage failures ───────────────────────────────────────────────────────

  /// A file-backed app plus a second connection to the same database.
  async fn file_app(name: &str) -> (Router, rusqlite::Connection) {
    let path = std::env::temp_dir().join(format!("deckstat-api-{}-{name}.sqlite3", std::process::id()));
    for suffix in ["", "-wal", "-shm"] {
      let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
    let store = SqliteStore::open(&path).await.unwrap();
    let side = rusqlite::Connection::open(&path).unwrap();
    (api_router(Arc::new(store), Limits::default()), side)
  }

  #[tokio::test]
  async fn failed_commit_is_an_opaque_500() {
    let (app, side) = file_app("commit-failure").await;
    side
      .execute_batch(
        "CREATE TRIGGER no_matches BEFORE INSERT ON match_records
         BEGIN SELECT RAISE(ABORT, 'disk on fire'); END;",
      )
      .unwrap();

    let (status, body) =
      send(&app, "POST", "/migrations/commit", Some(confirmed(snapshot()))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
      body,
      json!({ "error": "storage failure during migration; no records were written" })
    );

    let (_, catalog) = send(&app, "GET", "/catalog", None).await;
    assert_eq!(catalog, json!([]));
    let (_, decks) = send(&app, "GET", "/decks", None).await;
    assert_eq!(decks, json!([]));
  }

  #[tokio::test]
  async fn read_failure_hides_database_detail() {
    let (app, side) = file_app("read-failure").await;
    side.execute_batch("DROP TABLE match_records;").unwrap();

    let (status, body) = send(&app, "GET", "/matches", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": error::STORE_FAILURE }));
  }

  // ── Statistics ─────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn stats_after_commit() {
    let app = app().await;
    send(&app, "POST", "/migrations/commit", Some(confirmed(snapshot()))).await;

    let (status, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["overall"]["win_rate"], json!(50.0));
    assert_eq!(stats["by_turn"][0]["turn"], json!("first"));

    let (_, stats) = send(&app, "GET", "/stats?start_date=2025/01/27", None).await;
    assert_eq!(stats["overall"]["matches"], json!(1));
  }

  #[tokio::test]
  async fn unparseable_query_is_a_json_bad_request() {
    let app = app().await;
    for uri in ["/stats?season=abc", "/matches?season=-1", "/decks?active_only=maybe"] {
      let (status, body) = send(&app, "GET", uri, None).await;
      assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
      assert!(body["error"].is_string(), "{uri}");
    }
  }

  #[tokio::test]
  async fn stats_rejects_bad_dates() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/stats?start_date=26-01-2025", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("26-01-2025"));
  }

  // ── Records ────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn create_catalog_entry_and_fetch_it() {
    let app = app().await;
    let entry = json!({ "id": "c1", "className": "Dragoncraft", "label": "Ramp Dragon", "sortPosition": 0 });
    let (status, created) = send(&app, "POST", "/catalog", Some(entry)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["class"], json!("dragoncraft"));

    let (status, fetched) = send(&app, "GET", "/catalog/c1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
  }

  #[tokio::test]
  async fn invalid_record_is_unprocessable() {
    let app = app().await;
    let (status, body) = send(&app, "POST", "/catalog", Some(json!({ "id": "c1" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["report"]["rejections"][0]["id"], json!("c1"));
  }

  #[tokio::test]
  async fn match_with_missing_deck_is_unprocessable() {
    let app = app().await;
    let game = json!({
      "id": "m1", "date": "2025-01-26", "match_type": "ranked", "rank": "a",
      "group": "topaz", "owned_deck_ref": "ghost", "turn": "first", "outcome": "win",
      "opponent_ref": "ghost",
    });
    let (status, body) = send(&app, "POST", "/matches", Some(game)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["report"]["conflicts"].as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn missing_records_are_404() {
    let app = app().await;
    for uri in ["/catalog/nope", "/decks/nope", "/matches/nope"] {
      let (status, _) = send(&app, "GET", uri, None).await;
      assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
    let (status, _) = send(&app, "DELETE", "/decks/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn referenced_records_cannot_be_deleted() {
    let app = app().await;
    send(&app, "POST", "/migrations/commit", Some(confirmed(snapshot()))).await;

    let (status, body) = send(&app, "DELETE", "/catalog/opp", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("2 match_record"));

    let (status, _) = send(&app, "DELETE", "/decks/d1", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, "GET", "/catalog/opp", None).await;
    assert_eq!(status, StatusCode::OK);
  }

  #[tokio::test]
  async fn listings_and_deletes() {
    let app = app().await;
    send(&app, "POST", "/migrations/commit", Some(confirmed(snapshot()))).await;

    let (_, catalog) = send(&app, "GET", "/catalog", None).await;
    assert_eq!(catalog[0]["id"], json!("mine"));

    let (_, matches) = send(&app, "GET", "/matches?end_date=2025-01-26", None).await;
    assert_eq!(matches.as_array().unwrap().len(), 1);
    assert_eq!(matches[0]["date"], json!("2025-01-26"));

    let spare = json!({ "id": "spare", "class": "portalcraft", "label": "Artifact", "sort_position": 9 });
    send(&app, "POST", "/catalog", Some(spare)).await;
    let (status, _) = send(&app, "DELETE", "/catalog/spare", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, decks) = send(&app, "GET", "/decks?active_only=true", None).await;
    assert_eq!(decks.as_array().unwrap().len(), 1);
  }
}
