//! Hourly statistic rollups over raw sample history

use crate::direction::circular_mean;
use crate::types::{RawSample, StatisticRow};
use chrono::{DateTime, Duration, DurationRound, Utc};
use std::collections::BTreeMap;

/// Running min/max/mean over numeric observations
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    count: usize,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f64)
    }
}

fn hour_start(ts: &DateTime<Utc>) -> Option<DateTime<Utc>> {
    ts.duration_trunc(Duration::hours(1)).ok()
}

fn values_by_hour(samples: &[RawSample]) -> BTreeMap<DateTime<Utc>, Vec<f64>> {
    let mut hours: BTreeMap<DateTime<Utc>, Vec<f64>> = BTreeMap::new();
    for sample in samples {
        let (Some(value), Some(start)) = (sample.value(), hour_start(&sample.timestamp)) else {
            continue;
        };
        hours.entry(start).or_default().push(value);
    }
    hours
}

fn accumulate(values: &[f64]) -> Accumulator {
    let mut acc = Accumulator::new();
    for &value in values {
        acc.add(value);
    }
    acc
}

/// Summarise numeric samples per UTC hour, ascending by hour
pub fn rollup_hourly(samples: &[RawSample]) -> Vec<StatisticRow> {
    values_by_hour(samples)
        .into_iter()
        .map(|(start, values)| {
            let acc = accumulate(&values);
            StatisticRow {
                start,
                mean: acc.mean(),
                min: acc.min(),
                max: acc.max(),
            }
        })
        .collect()
}

/// Hourly rollup of compass bearings; the mean is circular
pub fn rollup_hourly_directions(samples: &[RawSample]) -> Vec<StatisticRow> {
    values_by_hour(samples)
        .into_iter()
        .map(|(start, angles)| {
            let acc = accumulate(&angles);
            StatisticRow {
                start,
                mean: circular_mean(&angles),
                min: acc.min(),
                max: acc.max(),
            }
        })
        .collect()
}
