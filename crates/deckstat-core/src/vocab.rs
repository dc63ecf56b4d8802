//! Closed vocabularies used by the entity model.
//!
//! Every enum here has a canonical lowercase snake_case spelling, which is
//! both its serde representation and the text stored in the database.
//! [`parse`](CardClass::parse) is lenient about case, surrounding whitespace,
//! and `-`/space separators because the legacy source was.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Fold a loosely-spelled token into canonical snake_case.
fn fold(raw: &str) -> String {
  raw
    .trim()
    .chars()
    .map(|c| match c {
      '-' | ' ' => '_',
      c => c.to_ascii_lowercase(),
    })
    .collect()
}

// ─── CardClass ───────────────────────────────────────────────────────────────

/// The fixed set of card-game factions a deck archetype belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardClass {
  Forestcraft,
  Swordcraft,
  Runecraft,
  Dragoncraft,
  Abysscraft,
  Havencraft,
  Portalcraft,
}

impl CardClass {
  pub const ALL: &'static [Self] = &[
    Self::Forestcraft,
    Self::Swordcraft,
    Self::Runecraft,
    Self::Dragoncraft,
    Self::Abysscraft,
    Self::Havencraft,
    Self::Portalcraft,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Forestcraft => "forestcraft",
      Self::Swordcraft => "swordcraft",
      Self::Runecraft => "runecraft",
      Self::Dragoncraft => "dragoncraft",
      Self::Abysscraft => "abysscraft",
      Self::Havencraft => "havencraft",
      Self::Portalcraft => "portalcraft",
    }
  }

  pub fn parse(raw: &str) -> Option<Self> {
    let folded = fold(raw);
    Self::ALL.iter().copied().find(|v| v.as_str() == folded)
  }
}

// ─── MatchType ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
  Ranked,
  CasualTable,
  LobbyTournament,
}

impl MatchType {
  pub const ALL: &'static [Self] =
    &[Self::Ranked, Self::CasualTable, Self::LobbyTournament];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Ranked => "ranked",
      Self::CasualTable => "casual_table",
      Self::LobbyTournament => "lobby_tournament",
    }
  }

  pub fn parse(raw: &str) -> Option<Self> {
    let folded = fold(raw);
    Self::ALL.iter().copied().find(|v| v.as_str() == folded)
  }
}

// ─── Rank ────────────────────────────────────────────────────────────────────

/// Ladder tier, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
  Beginner,
  D,
  C,
  B,
  A,
  Aa,
  Master,
  GrandMaster,
}

impl Rank {
  pub const ALL: &'static [Self] = &[
    Self::Beginner,
    Self::D,
    Self::C,
    Self::B,
    Self::A,
    Self::Aa,
    Self::Master,
    Self::GrandMaster,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Beginner => "beginner",
      Self::D => "d",
      Self::C => "c",
      Self::B => "b",
      Self::A => "a",
      Self::Aa => "aa",
      Self::Master => "master",
      Self::GrandMaster => "grand_master",
    }
  }

  pub fn parse(raw: &str) -> Option<Self> {
    let folded = fold(raw);
    Self::ALL.iter().copied().find(|v| v.as_str() == folded)
  }
}

// ─── RankGroup ───────────────────────────────────────────────────────────────

/// Ladder group. The grand-master group is split into numbered sub-tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankGroup {
  Emerald,
  Topaz,
  Ruby,
  Sapphire,
  Diamond,
  GrandMasterI,
  GrandMasterIi,
  GrandMasterIii,
  GrandMasterIv,
}

impl RankGroup {
  pub const ALL: &'static [Self] = &[
    Self::Emerald,
    Self::Topaz,
    Self::Ruby,
    Self::Sapphire,
    Self::Diamond,
    Self::GrandMasterI,
    Self::GrandMasterIi,
    Self::GrandMasterIii,
    Self::GrandMasterIv,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Emerald => "emerald",
      Self::Topaz => "topaz",
      Self::Ruby => "ruby",
      Self::Sapphire => "sapphire",
      Self::Diamond => "diamond",
      Self::GrandMasterI => "grand_master_i",
      Self::GrandMasterIi => "grand_master_ii",
      Self::GrandMasterIii => "grand_master_iii",
      Self::GrandMasterIv => "grand_master_iv",
    }
  }

  pub fn parse(raw: &str) -> Option<Self> {
    let folded = fold(raw);
    Self::ALL.iter().copied().find(|v| v.as_str() == folded)
  }
}

// ─── Turn / Outcome ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
  First,
  Second,
}

impl Turn {
  pub const ALL: &'static [Self] = &[Self::First, Self::Second];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::First => "first",
      Self::Second => "second",
    }
  }

  pub fn parse(raw: &str) -> Option<Self> {
    let folded = fold(raw);
    Self::ALL.iter().copied().find(|v| v.as_str() == folded)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Win,
  Loss,
}

impl Outcome {
  pub const ALL: &'static [Self] = &[Self::Win, Self::Loss];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Win => "win",
      Self::Loss => "loss",
    }
  }

  pub fn parse(raw: &str) -> Option<Self> {
    let folded = fold(raw);
    Self::ALL.iter().copied().find(|v| v.as_str() == folded)
  }
}

// ─── Shared plumbing ─────────────────────────────────────────────────────────

macro_rules! impl_display {
  ($($ty:ty => $name:literal),* $(,)?) => {
    $(
      impl fmt::Display for $ty {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
          f.write_str(self.as_str())
        }
      }

      impl std::str::FromStr for $ty {
        type Err = Error;

        fn from_str(s: &str) -> Result<Self> {
          Self::parse(s).ok_or_else(|| Error::UnknownValue {
            vocabulary: $name,
            value:      s.to_owned(),
          })
        }
      }
    )*
  };
}

impl_display! {
  CardClass => "class",
  MatchType => "match type",
  Rank => "rank",
  RankGroup => "rank group",
  Turn => "turn",
  Outcome => "outcome",
}

/// The canonical spellings of a vocabulary, for error messages.
pub fn spellings<T: Copy>(all: &[T], as_str: fn(T) -> &'static str) -> String {
  all.iter().map(|v| as_str(*v)).collect::<Vec<_>>().join(", ")
}
