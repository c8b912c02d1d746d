//! Digest bucket computation
//!
//! A digest bucket is the ISO-8601 week preceding the week that contains a
//! given date. ISO week numbering is used on both paths (the ordinary
//! `week - 1` case and the year rollover), so consecutive weeks always map
//! to consecutive buckets with nothing skipped or duplicated.
//!
//! The year of a bucket is the ISO week-based year. For example
//! 2021-01-01 belongs to week 53 of 2020, so its bucket is week 52 of 2020.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A (week, year) digest bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekBucket {
    pub week: u32,
    pub year: i32,
}

impl WeekBucket {
    /// Idempotency key of the digest published for this bucket
    pub fn short_name(&self) -> String {
        format!("best-of-{}-{}", self.week, self.year)
    }
}

impl std::fmt::Display for WeekBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.week, self.year)
    }
}

/// Bucket preceding the week that contains `now`
pub fn previous_week(now: DateTime<Utc>) -> Result<WeekBucket> {
    previous_week_of(now.date_naive())
}

/// Bucket preceding the week that contains `date`
pub fn previous_week_of(date: NaiveDate) -> Result<WeekBucket> {
    let iso = date.iso_week();
    if iso.week() > 1 {
        return Ok(WeekBucket {
            week: iso.week() - 1,
            year: iso.year(),
        });
    }

    let year = iso.year() - 1;
    Ok(WeekBucket {
        week: last_week_of(year)?,
        year,
    })
}

/// Number of the final ISO week of `year` (52 or 53)
///
/// December 28 always falls in the last ISO week of its year.
pub fn last_week_of(year: i32) -> Result<u32> {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|date| date.iso_week().week())
        .ok_or_else(|| Error::invalid_input(format!("year {} is outside the calendar range", year)))
}
