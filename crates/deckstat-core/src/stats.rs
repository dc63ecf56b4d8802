//! Statistics Aggregator: win/loss summaries over match records.
//!
//! [`aggregate`] is pure. It filters, orders the scan by date then
//! `created_at` (ties keep the caller's order, which the store delivers in
//! insertion order), and groups. Each breakdown lists groups in the order
//! they were first seen, except the opponent-deck breakdown and the opponent
//! distribution, which follow catalog `sort_position`, and the turn
//! breakdown, which is always first before second.

use std::{collections::HashMap, hash::Hash};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  date::normalize_date,
  entity::{DeckCatalogEntry, MatchRecord, OwnedDeck, RecordId},
  store::LedgerStore,
  vocab::{CardClass, MatchType, Outcome, Rank, RankGroup, Turn},
};

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Which match records a statistics run covers. Date bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsFilter {
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub season:     Option<u32>,
  pub match_type: Option<MatchType>,
}

/// A filter as it arrives from a query string or command line, before the
/// dates are normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawStatsFilter {
  #[serde(default, alias = "startDate", alias = "from")]
  pub start_date: Option<String>,
  #[serde(default, alias = "endDate", alias = "to")]
  pub end_date:   Option<String>,
  #[serde(default)]
  pub season:     Option<u32>,
  #[serde(default, alias = "matchType")]
  pub match_type: Option<String>,
}

impl TryFrom<RawStatsFilter> for StatsFilter {
  type Error = Error;

  fn try_from(raw: RawStatsFilter) -> Result<Self> {
    let date = |value: Option<String>| -> Result<Option<NaiveDate>> {
      match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => normalize_date(s).map(Some),
      }
    };
    Ok(Self {
      start_date: date(raw.start_date)?,
      end_date:   date(raw.end_date)?,
      season:     raw.season,
      match_type: raw.match_type.as_deref().map(str::parse::<MatchType>).transpose()?,
    })
  }
}

impl StatsFilter {
  pub fn matches(&self, record: &MatchRecord) -> bool {
    self.start_date.is_none_or(|start| record.date >= start)
      && self.end_date.is_none_or(|end| record.date <= end)
      && self.season.is_none_or(|season| record.season == Some(season))
      && self.match_type.is_none_or(|t| record.match_type == t)
  }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Round to one decimal place.
fn round1(value: f64) -> f64 { (value * 10.0).round() / 10.0 }

/// Matches, wins and losses for one group, plus the derived rate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
  pub matches:  u64,
  pub wins:     u64,
  pub losses:   u64,
  /// `wins / (wins + losses) * 100`, one decimal; `0.0` with no matches.
  pub win_rate: f64,
}

impl Tally {
  pub fn from_counts(wins: u64, losses: u64) -> Self {
    let mut tally = Self { matches: 0, wins, losses, win_rate: 0.0 };
    tally.settle();
    tally
  }

  fn record(&mut self, outcome: Outcome) {
    match outcome {
      Outcome::Win => self.wins += 1,
      Outcome::Loss => self.losses += 1,
    }
  }

  fn settle(&mut self) {
    self.matches = self.wins + self.losses;
    self.win_rate = if self.matches == 0 {
      0.0
    } else {
      round1(self.wins as f64 / self.matches as f64 * 100.0)
    };
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnedDeckTally {
  pub owned_deck_id: RecordId,
  pub label:         Option<String>,
  #[serde(flatten)]
  pub tally:         Tally,
}

/// Record against one opponent archetype. Catalog metadata is `None` when
/// the referenced entry was not supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentDeckTally {
  pub catalog_id:    RecordId,
  pub label:         Option<String>,
  pub class:         Option<CardClass>,
  pub sort_position: Option<u32>,
  #[serde(flatten)]
  pub tally:         Tally,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassTally {
  pub class: CardClass,
  #[serde(flatten)]
  pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankTally {
  pub rank:  Rank,
  pub group: RankGroup,
  #[serde(flatten)]
  pub tally: Tally,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnTally {
  pub turn:  Turn,
  #[serde(flatten)]
  pub tally: Tally,
}

/// How often one opponent archetype was faced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentShare {
  pub catalog_id: RecordId,
  pub label:      Option<String>,
  pub class:      Option<CardClass>,
  pub matches:    u64,
  /// Share of all filtered matches, one decimal.
  pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
  pub filter:                StatsFilter,
  pub overall:               Tally,
  pub by_owned_deck:         Vec<OwnedDeckTally>,
  pub by_opponent_deck:      Vec<OpponentDeckTally>,
  pub by_opponent_class:     Vec<ClassTally>,
  pub by_rank:               Vec<RankTally>,
  pub by_turn:               Vec<TurnTally>,
  pub opponent_distribution: Vec<OpponentShare>,
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// Tallies keyed by group, remembering first-seen order.
struct Groups<K> {
  order:  Vec<(K, Tally)>,
  lookup: HashMap<K, usize>,
}

impl<K: Eq + Hash + Clone> Groups<K> {
  fn new() -> Self { Self { order: Vec::new(), lookup: HashMap::new() } }

  fn record(&mut self, key: &K, outcome: Outcome) {
    let slot = match self.lookup.get(key) {
      Some(&slot) => slot,
      None => {
        self.order.push((key.clone(), Tally::default()));
        self.lookup.insert(key.clone(), self.order.len() - 1);
        self.order.len() - 1
      }
    };
    self.order[slot].1.record(outcome);
  }

  fn finish(self) -> Vec<(K, Tally)> {
    self
      .order
      .into_iter()
      .map(|(key, mut tally)| {
        tally.settle();
        (key, tally)
      })
      .collect()
  }
}

/// Compute every breakdown for the records selected by `filter`.
pub fn aggregate(
  records: &[MatchRecord],
  catalog: &[DeckCatalogEntry],
  decks: &[OwnedDeck],
  filter: &StatsFilter,
) -> Statistics {
  let catalog: HashMap<&RecordId, &DeckCatalogEntry> =
    catalog.iter().map(|e| (&e.id, e)).collect();
  let decks: HashMap<&RecordId, &OwnedDeck> = decks.iter().map(|d| (&d.id, d)).collect();

  let mut scan: Vec<&MatchRecord> = records.iter().filter(|r| filter.matches(r)).collect();
  scan.sort_by_key(|r| (r.date, r.created_at));

  let mut overall = Tally::default();
  let mut by_owned_deck = Groups::new();
  let mut by_opponent_deck = Groups::new();
  let mut by_opponent_class = Groups::new();
  let mut by_rank = Groups::new();
  let mut by_turn = Groups::new();

  for record in &scan {
    overall.record(record.outcome);
    by_owned_deck.record(&record.owned_deck_ref, record.outcome);
    by_opponent_deck.record(&record.opponent_ref, record.outcome);
    if let Some(entry) = catalog.get(&record.opponent_ref) {
      by_opponent_class.record(&entry.class, record.outcome);
    }
    by_rank.record(&(record.rank, record.group), record.outcome);
    by_turn.record(&record.turn, record.outcome);
  }
  overall.settle();

  let mut by_opponent_deck: Vec<OpponentDeckTally> = by_opponent_deck
    .finish()
    .into_iter()
    .map(|(id, tally)| {
      let entry = catalog.get(&id);
      OpponentDeckTally {
        label: entry.map(|e| e.label.clone()),
        class: entry.map(|e| e.class),
        sort_position: entry.map(|e| e.sort_position),
        catalog_id: id,
        tally,
      }
    })
    .collect();
  // Stable, so equal positions keep first-seen order. Unknown entries last.
  by_opponent_deck.sort_by_key(|t| t.sort_position.map_or((1, 0), |p| (0, p)));

  let opponent_distribution = by_opponent_deck
    .iter()
    .map(|t| OpponentShare {
      catalog_id: t.catalog_id.clone(),
      label:      t.label.clone(),
      class:      t.class,
      matches:    t.tally.matches,
      percentage: if overall.matches == 0 {
        0.0
      } else {
        round1(t.tally.matches as f64 / overall.matches as f64 * 100.0)
      },
    })
    .collect();

  let mut by_turn: Vec<TurnTally> = by_turn
    .finish()
    .into_iter()
    .map(|(turn, tally)| TurnTally { turn, tally })
    .collect();
  by_turn.sort_by_key(|t| t.turn == Turn::Second);

  Statistics {
    filter: *filter,
    overall,
    by_owned_deck: by_owned_deck
      .finish()
      .into_iter()
      .map(|(id, tally)| OwnedDeckTally {
        label: decks.get(&id).map(|d| d.label.clone()),
        owned_deck_id: id,
        tally,
      })
      .collect(),
    by_opponent_deck,
    by_opponent_class: by_opponent_class
      .finish()
      .into_iter()
      .map(|(class, tally)| ClassTally { class, tally })
      .collect(),
    by_rank: by_rank
      .finish()
      .into_iter()
      .map(|((rank, group), tally)| RankTally { rank, group, tally })
      .collect(),
    by_turn,
    opponent_distribution,
  }
}

/// Load what `filter` selects from `store` and aggregate it.
pub async fn statistics<S: LedgerStore>(
  store: &S,
  filter: &StatsFilter,
) -> Result<Statistics, S::Error> {
  let records = store.match_records(filter).await?;
  let catalog = store.list_catalog_entries().await?;
  let decks = store.list_owned_decks(false).await?;

  let stats = aggregate(&records, &catalog, &decks, filter);
  tracing::debug!(
    matches = stats.overall.matches,
    win_rate = stats.overall.win_rate,
    "computed statistics"
  );
  Ok(stats)
}
