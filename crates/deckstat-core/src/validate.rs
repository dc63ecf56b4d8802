//! Entity Validator: shape and business-rule checks for one inbound record.
//!
//! Validation never short-circuits. Every violated constraint on every field
//! is collected so the caller can fix a record in one pass.
//!
//! Field names are accepted in snake_case and in the legacy camelCase
//! spelling; violations always report the snake_case name. Identifier
//! fields accept JSON strings or integers, since legacy exports used both.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
  date::normalize_date,
  entity::{DeckCatalogEntry, Entity, EntityKind, MatchRecord, OwnedDeck, RecordId},
  vocab::{self, CardClass, MatchType, Outcome, Rank, RankGroup, Turn},
};

pub const ID_MAX_LEN: usize = 64;
pub const LABEL_MAX_LEN: usize = 100;

// ─── Context ─────────────────────────────────────────────────────────────────

/// Defaults applied to fields the inbound record may omit.
#[derive(Debug, Clone)]
pub struct ValidationContext {
  /// Stamped into absent `created_at` / `updated_at` fields.
  pub now:           DateTime<Utc>,
  /// Batch-level owner applied to owned decks that carry none.
  pub default_owner: Option<String>,
}

impl ValidationContext {
  pub fn new(default_owner: Option<String>) -> Self {
    Self { now: Utc::now(), default_owner }
  }
}

// ─── Violations ──────────────────────────────────────────────────────────────

/// The rule a field broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
  Required,
  Type,
  Enum,
  Length,
  NonNegative,
  Positive,
  DateFormat,
  TimestampFormat,
}

/// One broken constraint on one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldViolation {
  pub field:      String,
  pub constraint: Constraint,
  /// The offending value; `null` when the field is missing.
  pub value:      Value,
  /// Human-readable description of what would have been accepted.
  pub expected:   String,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Validate `raw` as a record of `kind`.
pub fn validate_record(
  kind: EntityKind,
  raw: &Value,
  ctx: &ValidationContext,
) -> Result<Entity, Vec<FieldViolation>> {
  let Some(record) = raw.as_object() else {
    return Err(vec![FieldViolation {
      field:      "$".to_owned(),
      constraint: Constraint::Type,
      value:      raw.clone(),
      expected:   "a JSON object".to_owned(),
    }]);
  };

  let fields = Fields::new(record);
  match kind {
    EntityKind::CatalogEntry => catalog_entry(fields),
    EntityKind::OwnedDeck => owned_deck(fields, ctx),
    EntityKind::MatchRecord => match_record(fields, ctx),
  }
}

/// Best-effort identifier extraction for rejection reports.
pub fn raw_id(raw: &Value) -> Option<String> {
  match raw.get("id")? {
    Value::String(s) => Some(s.trim().to_owned()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

fn catalog_entry(mut f: Fields<'_>) -> Result<Entity, Vec<FieldViolation>> {
  let id = f.identifier(&["id"]);
  let class = f.required_vocab(
    &["class", "class_name", "className"],
    CardClass::ALL,
    CardClass::as_str,
    CardClass::parse,
  );
  let label = f.required_text(&["label", "deck_label", "deckLabel"], 1, LABEL_MAX_LEN);
  let sort_position = f.required_u32(&["sort_position", "sortPosition"], false);

  match (id, class, label, sort_position) {
    (Some(id), Some(class), Some(label), Some(sort_position)) if f.is_clean() => {
      Ok(Entity::CatalogEntry(DeckCatalogEntry { id, class, label, sort_position }))
    }
    _ => Err(f.into_violations()),
  }
}

fn owned_deck(
  mut f: Fields<'_>,
  ctx: &ValidationContext,
) -> Result<Entity, Vec<FieldViolation>> {
  let id = f.identifier(&["id"]);
  let catalog_ref = f.identifier(&["catalog_ref", "catalogRef"]);
  let deck_code = f.required_opaque(&["deck_code", "deckCode"]);
  let label = f.required_text(&["label", "deck_label", "deckLabel"], 1, LABEL_MAX_LEN);
  let active = f.optional_bool(&["active", "is_active", "isActive"]);
  let owner_ref = f.optional_text(&["owner_ref", "ownerRef"], 1, ID_MAX_LEN);
  let created_at = f.optional_timestamp(&["created_at", "createdAt"]);
  let updated_at = f.optional_timestamp(&["updated_at", "updatedAt"]);

  match (id, catalog_ref, deck_code, label) {
    (Some(id), Some(catalog_ref), Some(deck_code), Some(label)) if f.is_clean() => {
      let created_at = created_at.unwrap_or(ctx.now);
      Ok(Entity::OwnedDeck(OwnedDeck {
        id,
        catalog_ref,
        deck_code,
        label,
        active: active.unwrap_or(true),
        owner_ref: owner_ref.or_else(|| ctx.default_owner.clone()),
        created_at,
        updated_at: updated_at.unwrap_or(created_at),
      }))
    }
    _ => Err(f.into_violations()),
  }
}

fn match_record(
  mut f: Fields<'_>,
  ctx: &ValidationContext,
) -> Result<Entity, Vec<FieldViolation>> {
  let id = f.identifier(&["id"]);
  let date = f.required_date(&["date", "match_date", "matchDate"]);
  let match_type = f.required_vocab(
    &["match_type", "matchType"],
    MatchType::ALL,
    MatchType::as_str,
    MatchType::parse,
  );
  let rank = f.required_vocab(&["rank"], Rank::ALL, Rank::as_str, Rank::parse);
  let group = f.required_vocab(
    &["group", "rank_group", "rankGroup"],
    RankGroup::ALL,
    RankGroup::as_str,
    RankGroup::parse,
  );
  let owned_deck_ref = f.identifier(&["owned_deck_ref", "ownedDeckRef"]);
  let turn = f.required_vocab(&["turn"], Turn::ALL, Turn::as_str, Turn::parse);
  let outcome = f.required_vocab(
    &["outcome", "result"],
    Outcome::ALL,
    Outcome::as_str,
    Outcome::parse,
  );
  let opponent_ref = f.identifier(&["opponent_ref", "opponentRef"]);
  let season = f.optional_u32(&["season"], true);
  let created_at = f.optional_timestamp(&["created_at", "createdAt"]);

  match (id, date, match_type, rank, group, owned_deck_ref, turn, outcome, opponent_ref) {
    (
      Some(id),
      Some(date),
      Some(match_type),
      Some(rank),
      Some(group),
      Some(owned_deck_ref),
      Some(turn),
      Some(outcome),
      Some(opponent_ref),
    ) if f.is_clean() => Ok(Entity::MatchRecord(MatchRecord {
      id,
      date,
      match_type,
      rank,
      group,
      owned_deck_ref,
      turn,
      outcome,
      opponent_ref,
      season,
      created_at: created_at.unwrap_or(ctx.now),
    })),
    _ => Err(f.into_violations()),
  }
}

// ─── Field reader ────────────────────────────────────────────────────────────

/// Reads typed fields out of a JSON object, recording every violation.
///
/// Each accessor returns `None` when the field is absent or invalid; in the
/// invalid case (and the absent-but-required case) a violation is recorded.
struct Fields<'a> {
  record:     &'a Map<String, Value>,
  violations: Vec<FieldViolation>,
}

impl<'a> Fields<'a> {
  fn new(record: &'a Map<String, Value>) -> Self {
    Self { record, violations: Vec::new() }
  }

  fn is_clean(&self) -> bool { self.violations.is_empty() }

  fn into_violations(self) -> Vec<FieldViolation> { self.violations }

  /// First non-null value under any of `names`.
  fn lookup(&self, names: &[&str]) -> Option<&'a Value> {
    let record = self.record;
    names
      .iter()
      .filter_map(|n| record.get(*n))
      .find(|v| !v.is_null())
  }

  fn violate(
    &mut self,
    names: &[&str],
    constraint: Constraint,
    value: &Value,
    expected: impl Into<String>,
  ) {
    self.violations.push(FieldViolation {
      field: names[0].to_owned(),
      constraint,
      value: value.clone(),
      expected: expected.into(),
    });
  }

  fn missing(&mut self, names: &[&str], expected: impl Into<String>) {
    self.violate(names, Constraint::Required, &Value::Null, expected);
  }

  fn identifier(&mut self, names: &[&str]) -> Option<RecordId> {
    let expected = format!("identifier of 1..={ID_MAX_LEN} characters");
    let Some(value) = self.lookup(names) else {
      self.missing(names, expected);
      return None;
    };
    let id = match value {
      Value::String(s) => s.trim().to_owned(),
      Value::Number(n) if n.is_u64() || n.is_i64() => n.to_string(),
      other => {
        self.violate(names, Constraint::Type, other, expected);
        return None;
      }
    };
    if id.is_empty() || id.chars().count() > ID_MAX_LEN {
      self.violate(names, Constraint::Length, value, expected);
      return None;
    }
    Some(RecordId::new(id))
  }

  fn text(&mut self, names: &[&str], min: usize, max: usize) -> Option<Option<String>> {
    let expected = format!("string of {min}..={max} characters");
    let value = self.lookup(names)?;
    let Value::String(s) = value else {
      self.violate(names, Constraint::Type, value, expected);
      return Some(None);
    };
    let trimmed = s.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
      self.violate(names, Constraint::Length, value, expected);
      return Some(None);
    }
    Some(Some(trimmed.to_owned()))
  }

  fn required_text(&mut self, names: &[&str], min: usize, max: usize) -> Option<String> {
    match self.text(names, min, max) {
      Some(parsed) => parsed,
      None => {
        self.missing(names, format!("string of {min}..={max} characters"));
        None
      }
    }
  }

  fn optional_text(&mut self, names: &[&str], min: usize, max: usize) -> Option<String> {
    self.text(names, min, max).flatten()
  }

  /// A required string with no format or length rule; kept verbatim.
  fn required_opaque(&mut self, names: &[&str]) -> Option<String> {
    match self.lookup(names) {
      Some(Value::String(s)) => Some(s.clone()),
      Some(other) => {
        self.violate(names, Constraint::Type, other, "string");
        None
      }
      None => {
        self.missing(names, "string");
        None
      }
    }
  }

  fn required_vocab<T: Copy>(
    &mut self,
    names: &[&str],
    all: &[T],
    as_str: fn(T) -> &'static str,
    parse: fn(&str) -> Option<T>,
  ) -> Option<T> {
    let expected = format!("one of: {}", vocab::spellings(all, as_str));
    match self.lookup(names) {
      Some(Value::String(s)) => {
        let parsed = parse(s);
        if parsed.is_none() {
          self.violate(names, Constraint::Enum, &Value::String(s.clone()), expected);
        }
        parsed
      }
      Some(other) => {
        self.violate(names, Constraint::Type, other, expected);
        None
      }
      None => {
        self.missing(names, expected);
        None
      }
    }
  }

  fn uint(&mut self, names: &[&str], positive: bool) -> Option<Option<u32>> {
    let (constraint, expected) = if positive {
      (Constraint::Positive, "positive integer")
    } else {
      (Constraint::NonNegative, "non-negative integer")
    };
    let value = self.lookup(names)?;
    let Some(n) = value.as_i64() else {
      self.violate(names, Constraint::Type, value, expected);
      return Some(None);
    };
    let floor = if positive { 1 } else { 0 };
    if n < floor {
      self.violate(names, constraint, value, expected);
      return Some(None);
    }
    match u32::try_from(n) {
      Ok(n) => Some(Some(n)),
      Err(_) => {
        self.violate(names, Constraint::Type, value, expected);
        Some(None)
      }
    }
  }

  fn required_u32(&mut self, names: &[&str], positive: bool) -> Option<u32> {
    match self.uint(names, positive) {
      Some(parsed) => parsed,
      None => {
        let expected =
          if positive { "positive integer" } else { "non-negative integer" };
        self.missing(names, expected);
        None
      }
    }
  }

  fn optional_u32(&mut self, names: &[&str], positive: bool) -> Option<u32> {
    self.uint(names, positive).flatten()
  }

  fn optional_bool(&mut self, names: &[&str]) -> Option<bool> {
    match self.lookup(names)? {
      Value::Bool(b) => Some(*b),
      other => {
        self.violate(names, Constraint::Type, other, "boolean");
        None
      }
    }
  }

  fn required_date(&mut self, names: &[&str]) -> Option<NaiveDate> {
    let expected = "date as YYYY-MM-DD or YYYY/MM/DD";
    match self.lookup(names) {
      Some(Value::String(s)) => match normalize_date(s) {
        Ok(date) => Some(date),
        Err(_) => {
          self.violate(names, Constraint::DateFormat, &Value::String(s.clone()), expected);
          None
        }
      },
      Some(other) => {
        self.violate(names, Constraint::Type, other, expected);
        None
      }
      None => {
        self.missing(names, expected);
        None
      }
    }
  }

  fn optional_timestamp(&mut self, names: &[&str]) -> Option<DateTime<Utc>> {
    let expected = "RFC 3339 timestamp";
    match self.lookup(names)? {
      Value::String(s) => match DateTime::parse_from_rfc3339(s.trim()) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => {
          self.violate(
            names,
            Constraint::TimestampFormat,
            &Value::String(s.clone()),
            expected,
          );
          None
        }
      },
      other => {
        self.violate(names, Constraint::Type, other, expected);
        None
      }
    }
  }
}
