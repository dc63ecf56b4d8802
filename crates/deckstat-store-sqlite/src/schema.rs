//! SQL schema for the deckstat SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Foreign keys restrict deletes as a backstop only. The store checks
/// references itself first so it can report how many rows block a delete.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS catalog_entries (
    id             TEXT PRIMARY KEY,
    class          TEXT NOT NULL,
    label          TEXT NOT NULL,
    sort_position  INTEGER NOT NULL CHECK (sort_position >= 0)
);

CREATE TABLE IF NOT EXISTS owned_decks (
    id           TEXT PRIMARY KEY,
    catalog_ref  TEXT NOT NULL REFERENCES catalog_entries(id) ON DELETE RESTRICT,
    deck_code    TEXT NOT NULL,
    label        TEXT NOT NULL,
    active       INTEGER NOT NULL DEFAULT 1,
    owner_ref    TEXT,
    created_at   TEXT NOT NULL,   -- RFC 3339 UTC, fixed nanosecond width
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS match_records (
    id              TEXT PRIMARY KEY,
    date            TEXT NOT NULL
                    CHECK (date GLOB '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]'),
    match_type      TEXT NOT NULL,
    rank            TEXT NOT NULL,
    rank_group      TEXT NOT NULL,
    owned_deck_ref  TEXT NOT NULL REFERENCES owned_decks(id) ON DELETE RESTRICT,
    turn            TEXT NOT NULL,   -- 'first' | 'second'
    outcome         TEXT NOT NULL,   -- 'win' | 'loss'
    opponent_ref    TEXT NOT NULL REFERENCES catalog_entries(id) ON DELETE RESTRICT,
    season          INTEGER CHECK (season IS NULL OR season > 0),
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS owned_decks_catalog_idx    ON owned_decks(catalog_ref);
CREATE INDEX IF NOT EXISTS match_records_date_idx     ON match_records(date, created_at);
CREATE INDEX IF NOT EXISTS match_records_deck_idx     ON match_records(owned_deck_ref);
CREATE INDEX IF NOT EXISTS match_records_opponent_idx ON match_records(opponent_ref);

PRAGMA user_version = 1;
";
