//! Integration tests for `SqliteStore` against an in-memory database.

use deckstat_core::{
  Error as CoreError,
  batch::MigrationBatch,
  entity::{EntityKind, RecordId},
  integrity::IntegrityConflict,
  migrate::{MigrationError, PreconditionFailure, commit, dry_run},
  stats::{RawStatsFilter, StatsFilter, statistics},
  store::{AsCoreError, EntityCounts, LedgerStore},
  vocab::{CardClass, Outcome},
};
use serde_json::{Value, json};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn catalog(id: &str, class: &str, sort_position: u32) -> Value {
  json!({ "id": id, "class": class, "label": format!("{id} deck"), "sort_position": sort_position })
}

fn deck(id: &str, catalog_ref: &str) -> Value {
  json!({ "id": id, "catalogRef": catalog_ref, "deckCode": "AAEBAQcG", "label": "Ladder list" })
}

fn game(id: &str, date: &str, deck: &str, opponent: &str, outcome: &str) -> Value {
  json!({
    "id": id,
    "date": date,
    "matchType": "ranked",
    "rank": "master",
    "group": "sapphire",
    "ownedDeckRef": deck,
    "turn": "first",
    "outcome": outcome,
    "opponentRef": opponent,
    "season": 4,
  })
}

/// A pre-existing opponent archetype, committed on its own.
async fn seeded() -> SqliteStore {
  let s = store().await;
  let batch = MigrationBatch::single(EntityKind::CatalogEntry, catalog("opp", "havencraft", 2));
  commit(&s, &batch, true).await.unwrap();
  s
}

/// One catalog entry, one owned deck, two matches against `opp`.
fn scenario_batch() -> MigrationBatch {
  serde_json::from_value(json!({
    "catalogEntries": [catalog("mine", "runecraft", 1)],
    "ownedDecks": [deck("d1", "mine")],
    "matchRecords": [
      game("m1", "2025/01/26", "d1", "opp", "win"),
      game("m2", "2025-01-27", "d1", "opp", "loss"),
    ],
  }))
  .unwrap()
}

// ─── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn legacy_snapshot_end_to_end() {
  let s = seeded().await;
  let batch = scenario_batch();

  let report = dry_run(&s, &batch).await.unwrap();
  assert!(report.can_commit);
  assert!(report.rejections.is_empty());
  assert_eq!(report.counts.match_records.accepted, 2);

  let manifest = commit(&s, &batch, true).await.unwrap();
  assert_eq!(manifest.batch_digest, report.batch_digest);
  assert_eq!(manifest.catalog_entries, vec![RecordId::from("mine")]);
  assert_eq!(manifest.owned_decks, vec![RecordId::from("d1")]);
  assert_eq!(manifest.match_records, vec![RecordId::from("m1"), RecordId::from("m2")]);

  let stats = statistics(&s, &StatsFilter::default()).await.unwrap();
  assert_eq!(stats.overall.matches, 2);
  assert_eq!(stats.overall.win_rate, 50.0);
  assert_eq!(stats.by_owned_deck[0].label.as_deref(), Some("Ladder list"));
  assert_eq!(stats.by_opponent_class[0].class, CardClass::Havencraft);
}

#[tokio::test]
async fn committed_records_read_back_canonical() {
  let s = seeded().await;
  commit(&s, &scenario_batch(), true).await.unwrap();

  let m1 = s.get_match_record("m1".into()).await.unwrap().unwrap();
  assert_eq!(m1.date.to_string(), "2025-01-26");
  assert_eq!(m1.outcome, Outcome::Win);
  assert_eq!(m1.season, Some(4));

  let d1 = s.get_owned_deck("d1".into()).await.unwrap().unwrap();
  assert!(d1.active);
  assert_eq!(d1.owner_ref, None);
  assert_eq!(d1.catalog_ref, RecordId::from("mine"));

  let entries: Vec<_> = s
    .list_catalog_entries()
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.id)
    .collect();
  assert_eq!(entries, vec![RecordId::from("mine"), RecordId::from("opp")]);

  assert!(s.get_catalog_entry("nope".into()).await.unwrap().is_none());
}

// ─── Dry-run / commit ────────────────────────────────────────────────────────

#[tokio::test]
async fn dry_run_never_writes() {
  let s = seeded().await;
  let before = s.counts().await.unwrap();
  dry_run(&s, &scenario_batch()).await.unwrap();
  assert_eq!(s.counts().await.unwrap(), before);
}

#[tokio::test]
async fn unconfirmed_commit_carries_the_dry_run_report() {
  let s = seeded().await;
  let mut batch = scenario_batch();
  batch.push(EntityKind::MatchRecord, json!({ "id": "bad", "date": "2025-13-01" }));

  let expected = dry_run(&s, &batch).await.unwrap();
  assert!(!expected.can_commit);

  let err = commit(&s, &batch, false).await.unwrap_err();
  let MigrationError::Precondition { reason, report } = err else {
    panic!("expected precondition failure");
  };
  assert_eq!(reason, PreconditionFailure::NotConfirmed);
  assert_eq!(*report, expected);
}

#[tokio::test]
async fn invalid_batch_is_refused_whole() {
  let s = seeded().await;
  let before = s.counts().await.unwrap();
  let mut batch = scenario_batch();
  batch.push(EntityKind::MatchRecord, game("m3", "2025-01/28", "d1", "opp", "win"));

  let err = commit(&s, &batch, true).await.unwrap_err();
  assert!(matches!(err, MigrationError::Precondition {
    reason: PreconditionFailure::NotCommittable,
    ..
  }));
  assert_eq!(err.report().unwrap().rejections.len(), 1);
  assert_eq!(s.counts().await.unwrap(), before);
}

#[tokio::test]
async fn forward_reference_is_rejected() {
  let s = seeded().await;
  let tagged = |kind: &str, mut raw: Value| {
    raw["kind"] = json!(kind);
    raw
  };
  let batch: MigrationBatch = serde_json::from_value(json!({
    "records": [
      tagged("match_record", game("m1", "2025-01-26", "d1", "opp", "win")),
      tagged("owned_deck", deck("d1", "opp")),
    ],
  }))
  .unwrap();

  let report = dry_run(&s, &batch).await.unwrap();
  assert!(!report.can_commit);
  assert!(matches!(
    &report.conflicts[..],
    [IntegrityConflict::UnresolvedReference { forward: true, target: EntityKind::OwnedDeck, .. }]
  ));
}

#[tokio::test]
async fn recommit_conflicts_with_persisted_ids() {
  let s = seeded().await;
  commit(&s, &scenario_batch(), true).await.unwrap();

  let report = dry_run(&s, &scenario_batch()).await.unwrap();
  let persisted = report
    .conflicts
    .iter()
    .filter(|c| matches!(c, IntegrityConflict::AlreadyPersisted { .. }))
    .count();
  assert_eq!(persisted, 4);
}

#[tokio::test]
async fn concurrent_duplicate_commits_land_once() {
  let s = seeded().await;
  let (first, second) = (scenario_batch(), scenario_batch());
  let (a, b) = tokio::join!(commit(&s, &first, true), commit(&s, &second, true));

  assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
  let refused = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
  assert!(matches!(refused, MigrationError::Precondition {
    reason: PreconditionFailure::NotCommittable,
    ..
  }));
  assert_eq!(s.counts().await.unwrap().match_records, 2);
}

// ─── Atomicity ───────────────────────────────────────────────────────────────

/// Make the `nth` insert from now on (counting across all three tables)
/// abort.
async fn fail_on_insert(s: &SqliteStore, nth: usize) {
  let threshold = nth - 1;
  s.conn
    .call(move |conn| {
      conn.execute_batch("CREATE TABLE insert_log (n INTEGER);")?;
      for table in ["catalog_entries", "owned_decks", "match_records"] {
        conn.execute_batch(&format!(
          "CREATE TRIGGER fail_{table} BEFORE INSERT ON {table}
             WHEN (SELECT COUNT(*) FROM insert_log) >= {threshold}
           BEGIN SELECT RAISE(ABORT, 'injected failure'); END;
           CREATE TRIGGER log_{table} AFTER INSERT ON {table}
           BEGIN INSERT INTO insert_log VALUES (1); END;"
        ))?;
      }
      Ok(())
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn storage_failure_rolls_back_every_insert() {
  for nth in 1..=4 {
    let s = seeded().await;
    let before = s.counts().await.unwrap();
    fail_on_insert(&s, nth).await;

    let err = commit(&s, &scenario_batch(), true).await.unwrap_err();
    assert!(matches!(err, MigrationError::Storage(_)), "insert {nth}: {err}");
    assert_eq!(s.counts().await.unwrap(), before, "insert {nth}");
  }
}

#[tokio::test]
async fn failed_commit_can_be_retried() {
  let s = seeded().await;
  fail_on_insert(&s, 3).await;
  assert!(commit(&s, &scenario_batch(), true).await.is_err());

  s.conn
    .call(|conn| {
      conn.execute_batch(
        "DROP TRIGGER fail_catalog_entries;
         DROP TRIGGER fail_owned_decks;
         DROP TRIGGER fail_match_records;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let manifest = commit(&s, &scenario_batch(), true).await.unwrap();
  assert_eq!(manifest.total(), 4);
}

// ─── Deletes ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn referenced_catalog_entry_cannot_be_deleted() {
  let s = seeded().await;
  commit(&s, &scenario_batch(), true).await.unwrap();

  let err = s.delete_catalog_entry("opp".into()).await.unwrap_err();
  assert_eq!(
    err.as_core(),
    Some(&CoreError::DeleteConstraint {
      kind:          EntityKind::CatalogEntry,
      id:            "opp".into(),
      references:    2,
      referenced_by: EntityKind::MatchRecord,
    })
  );
  assert!(s.get_catalog_entry("opp".into()).await.unwrap().is_some());

  // Only owned decks point at `mine`.
  let err = s.delete_catalog_entry("mine".into()).await.unwrap_err();
  assert!(matches!(
    err.as_core(),
    Some(CoreError::DeleteConstraint { references: 1, referenced_by: EntityKind::OwnedDeck, .. })
  ));
}

#[tokio::test]
async fn referenced_owned_deck_cannot_be_deleted() {
  let s = seeded().await;
  commit(&s, &scenario_batch(), true).await.unwrap();

  let err = s.delete_owned_deck("d1".into()).await.unwrap_err();
  assert!(matches!(
    err.as_core(),
    Some(CoreError::DeleteConstraint { references: 2, referenced_by: EntityKind::MatchRecord, .. })
  ));
  assert_eq!(s.counts().await.unwrap().owned_decks, 1);
}

#[tokio::test]
async fn unreferenced_entries_delete_and_missing_ones_are_not_found() {
  let s = seeded().await;
  s.delete_catalog_entry("opp".into()).await.unwrap();
  assert_eq!(s.counts().await.unwrap(), EntityCounts::default());

  let err = s.delete_catalog_entry("opp".into()).await.unwrap_err();
  assert!(matches!(err.as_core(), Some(CoreError::NotFound { .. })));
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn date_filter_accepts_either_separator() {
  let s = seeded().await;
  commit(&s, &scenario_batch(), true).await.unwrap();

  let filter = |from: &str, to: &str| {
    StatsFilter::try_from(RawStatsFilter {
      start_date: Some(from.into()),
      end_date: Some(to.into()),
      ..RawStatsFilter::default()
    })
    .unwrap()
  };

  let slash = s.match_records(&filter("2025/01/26", "2025/1/26")).await.unwrap();
  let dash = s.match_records(&filter("2025-01-26", "2025-01-26")).await.unwrap();
  assert_eq!(slash, dash);
  assert_eq!(slash.len(), 1);
  assert_eq!(slash[0].id, RecordId::from("m1"));

  let season = StatsFilter { season: Some(5), ..StatsFilter::default() };
  assert!(s.match_records(&season).await.unwrap().is_empty());
}

#[tokio::test]
async fn active_only_listing() {
  let s = seeded().await;
  let batch: MigrationBatch = serde_json::from_value(json!({
    "ownedDecks": [
      deck("on", "opp"),
      { "id": "off", "catalog_ref": "opp", "deck_code": "", "label": "Retired", "active": false },
    ],
    "ownerRef": "player-1",
  }))
  .unwrap();
  commit(&s, &batch, true).await.unwrap();

  let all = s.list_owned_decks(false).await.unwrap();
  assert_eq!(all.len(), 2);
  assert!(all.iter().all(|d| d.owner_ref.as_deref() == Some("player-1")));

  let active = s.list_owned_decks(true).await.unwrap();
  assert_eq!(active.len(), 1);
  assert_eq!(active[0].id, RecordId::from("on"));
}

// ─── Shared files ────────────────────────────────────────────────────────────

/// A fresh database path under the system temp dir.
fn temp_db(name: &str) -> std::path::PathBuf {
  let path = std::env::temp_dir().join(format!("deckstat-{}-{name}.sqlite3", std::process::id()));
  for suffix in ["", "-wal", "-shm"] {
    let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
  }
  path
}

#[tokio::test]
async fn commit_waits_for_another_writer() {
  let path = temp_db("busy");
  let s = SqliteStore::open(&path).await.unwrap();

  let blocker = rusqlite::Connection::open(&path).unwrap();
  blocker.execute_batch("BEGIN IMMEDIATE;").unwrap();
  let release = std::thread::spawn(move || {
    std::thread::sleep(std::time::Duration::from_millis(300));
    blocker.execute_batch("COMMIT;").unwrap();
  });

  let batch = MigrationBatch::single(EntityKind::CatalogEntry, catalog("opp", "havencraft", 2));
  let manifest = commit(&s, &batch, true).await.unwrap();
  assert_eq!(manifest.catalog_entries, vec![RecordId::from("opp")]);

  release.join().unwrap();
  assert_eq!(s.counts().await.unwrap().catalog_entries, 1);
}
