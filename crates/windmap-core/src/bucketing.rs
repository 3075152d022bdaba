//! Local-time bucketing of sample instants
//!
//! A bucket is identified by the local calendar date and the first hour of
//! the interval the sample falls in. Only divisors of 24 are accepted as
//! interval widths so every day splits into the same number of rows.

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bucketing error
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BucketError {
    #[error("time interval must be one of 1, 2, 3, 4, 6, 8, 12, 24 (got {0})")]
    InvalidInterval(u32),

    #[error("malformed bucket key: {0}")]
    InvalidKey(String),
}

/// Width of one grid row in hours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum IntervalHours {
    One,
    #[default]
    Two,
    Three,
    Four,
    Six,
    Eight,
    Twelve,
    TwentyFour,
}

impl IntervalHours {
    pub const ALL: [IntervalHours; 8] = [
        IntervalHours::One,
        IntervalHours::Two,
        IntervalHours::Three,
        IntervalHours::Four,
        IntervalHours::Six,
        IntervalHours::Eight,
        IntervalHours::Twelve,
        IntervalHours::TwentyFour,
    ];

    pub fn hours(self) -> u32 {
        match self {
            IntervalHours::One => 1,
            IntervalHours::Two => 2,
            IntervalHours::Three => 3,
            IntervalHours::Four => 4,
            IntervalHours::Six => 6,
            IntervalHours::Eight => 8,
            IntervalHours::Twelve => 12,
            IntervalHours::TwentyFour => 24,
        }
    }

    /// Number of grid rows per day
    pub fn rows_per_day(self) -> usize {
        (24 / self.hours()) as usize
    }

    /// Start hour of every row, ascending
    pub fn row_hours(self) -> impl Iterator<Item = u32> {
        (0..24).step_by(self.hours() as usize)
    }
}

impl TryFrom<u32> for IntervalHours {
    type Error = BucketError;

    fn try_from(hours: u32) -> Result<Self, Self::Error> {
        IntervalHours::ALL
            .into_iter()
            .find(|interval| interval.hours() == hours)
            .ok_or(BucketError::InvalidInterval(hours))
    }
}

impl From<IntervalHours> for u32 {
    fn from(interval: IntervalHours) -> Self {
        interval.hours()
    }
}

/// Row label style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12")]
    Twelve,
    #[default]
    #[serde(rename = "24")]
    TwentyFour,
}

/// Composite key of a bucket: local date plus bucket start hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey {
    pub date: NaiveDate,
    pub hour: u32,
}

impl BucketKey {
    pub fn new(date: NaiveDate, hour: u32) -> Self {
        Self { date, hour }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.date.format("%Y-%m-%d"), self.hour)
    }
}

impl FromStr for BucketKey {
    type Err = BucketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || BucketError::InvalidKey(s.to_string());
        let (date, hour) = s.split_once('_').ok_or_else(invalid)?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        if hour > 23 {
            return Err(invalid());
        }
        Ok(BucketKey { date, hour })
    }
}

/// Local calendar date of an instant.
///
/// Computed from the local wall clock of the instant itself, so instants on
/// either side of a DST change still share the date of their local day.
pub fn date_key<Tz: TimeZone>(instant: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Start hour of the interval containing `hour`
pub fn hour_bucket(hour: u32, interval: IntervalHours) -> u32 {
    let width = interval.hours();
    (hour / width) * width
}

/// Bucket an instant falls in, in local time
pub fn bucket_key<Tz: TimeZone>(
    instant: &DateTime<Utc>,
    tz: &Tz,
    interval: IntervalHours,
) -> BucketKey {
    let local = instant.with_timezone(tz);
    BucketKey {
        date: local.date_naive(),
        hour: hour_bucket(local.hour(), interval),
    }
}

/// Row label: `"07"` in 24h format, `"7a"` / `"12p"` in 12h format
pub fn hour_label(hour: u32, format: TimeFormat) -> String {
    match format {
        TimeFormat::TwentyFour => format!("{:02}", hour),
        TimeFormat::Twelve => {
            let h = match hour {
                0 => 12,
                h if h > 12 => h - 12,
                h => h,
            };
            let suffix = if hour < 12 { 'a' } else { 'p' };
            format!("{}{}", h, suffix)
        }
    }
}
