//! Core data types for raw sensor samples

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One raw reading from a sensor history.
///
/// The value arrives as a string (sensors report states such as
/// `"unavailable"`); it is only parsed when the sample is bucketed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawSample {
    /// Instant the reading was taken
    #[serde(rename = "last_changed", alias = "last_updated")]
    pub timestamp: DateTime<Utc>,

    /// Unparsed sensor state
    #[serde(rename = "state")]
    pub raw_value: String,
}

impl RawSample {
    pub fn new(timestamp: DateTime<Utc>, raw_value: impl Into<String>) -> Self {
        Self {
            timestamp,
            raw_value: raw_value.into(),
        }
    }

    /// Numeric value of the sample, or `None` when the state is not a number.
    pub fn value(&self) -> Option<f64> {
        self.raw_value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }
}

/// Hourly long-term statistic for one sensor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatisticRow {
    /// Start of the hour the row summarises
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl StatisticRow {
    pub fn value(&self, kind: StatisticType) -> Option<f64> {
        match kind {
            StatisticType::Max => self.max,
            StatisticType::Mean => self.mean,
            StatisticType::Min => self.min,
        }
    }
}

/// Which field of a statistic row stands in for the speed of that hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticType {
    #[default]
    Max,
    Mean,
    Min,
}

/// Where sample series are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Statistics for past periods, history for the current one
    #[default]
    Auto,
    History,
    Statistics,
}
