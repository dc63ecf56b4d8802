//! Calendar-date canonicalization.
//!
//! Legacy data mixes `YYYY/MM/DD` and `YYYY-MM-DD`. Both are accepted on the
//! way in (with one- or two-digit month and day), one separator per value.
//! Everything persisted or compared uses [`CANONICAL_FORMAT`].

use chrono::NaiveDate;

use crate::{Error, Result};

pub const CANONICAL_FORMAT: &str = "%Y-%m-%d";

/// Parse an inbound date in either separator convention.
pub fn normalize_date(raw: &str) -> Result<NaiveDate> {
  let invalid = || Error::InvalidDate(raw.to_owned());
  let trimmed = raw.trim();

  let sep = match (trimmed.contains('-'), trimmed.contains('/')) {
    (true, false) => '-',
    (false, true) => '/',
    _ => return Err(invalid()),
  };

  let parts: Vec<&str> = trimmed.split(sep).collect();
  let [year, month, day] = parts[..] else {
    return Err(invalid());
  };

  let digits = |s: &str, min: usize, max: usize| {
    (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
  };
  if !digits(year, 4, 4) || !digits(month, 1, 2) || !digits(day, 1, 2) {
    return Err(invalid());
  }

  let year: i32 = year.parse().map_err(|_| invalid())?;
  let month: u32 = month.parse().map_err(|_| invalid())?;
  let day: u32 = day.parse().map_err(|_| invalid())?;

  NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Normalize and render in canonical form.
pub fn canonicalize(raw: &str) -> Result<String> {
  Ok(format_date(normalize_date(raw)?))
}

pub fn format_date(date: NaiveDate) -> String {
  date.format(CANONICAL_FORMAT).to_string()
}
