//! Sample series → day × time-bucket grid
//!
//! Speed samples define which buckets exist: each bucket keeps the highest
//! speed seen in it, so short gusts stay visible. Direction samples only
//! attach to buckets that already hold a speed and are averaged on the
//! circle.

use crate::bucketing::{bucket_key, date_key, hour_label, BucketKey, IntervalHours, TimeFormat};
use crate::direction::circular_mean;
use crate::types::RawSample;
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Largest supported day span
pub const MAX_DAYS: u32 = 30;

/// Aggregated samples of one bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketAggregate {
    pub max_speed: Option<f64>,
    pub direction_samples: Vec<f64>,
    pub avg_direction: Option<f64>,
}

impl BucketAggregate {
    fn add_speed(&mut self, value: f64) {
        self.max_speed = Some(match self.max_speed {
            Some(current) => current.max(value),
            None => value,
        });
    }
}

/// One grid cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub date: NaiveDate,
    pub speed: Option<f64>,
    /// Mean direction in [0, 360)
    pub direction: Option<f64>,
    pub has_data: bool,
    /// Bucket is still being filled (contains "now")
    pub is_partial: bool,
}

/// One time-of-day row across all dates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub hour: u32,
    pub label: String,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<Row>,
}

impl Grid {
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }

    pub fn row_for_hour(&self, hour: u32) -> Option<&Row> {
        self.rows.iter().find(|row| row.hour == hour)
    }
}

/// Summary over all cells with data; zero when there are none
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

impl Stats {
    pub fn from_speeds(speeds: &[f64]) -> Self {
        if speeds.is_empty() {
            return Stats::default();
        }
        let min = speeds.iter().copied().fold(f64::INFINITY, f64::min);
        let max = speeds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg = speeds.iter().sum::<f64>() / speeds.len() as f64;
        Stats { min, max, avg }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapData {
    pub grid: Grid,
    pub stats: Stats,
}

/// Fold both series into per-bucket aggregates
pub fn bucket_samples<Tz: TimeZone>(
    speed: &[RawSample],
    direction: &[RawSample],
    tz: &Tz,
    interval: IntervalHours,
) -> HashMap<BucketKey, BucketAggregate> {
    let mut buckets: HashMap<BucketKey, BucketAggregate> = HashMap::new();

    for sample in speed {
        if let Some(value) = sample.value() {
            buckets
                .entry(bucket_key(&sample.timestamp, tz, interval))
                .or_default()
                .add_speed(value);
        }
    }

    for sample in direction {
        if let Some(value) = sample.value() {
            // Direction without a speed reading in the same bucket is dropped
            if let Some(bucket) = buckets.get_mut(&bucket_key(&sample.timestamp, tz, interval)) {
                bucket.direction_samples.push(value);
            }
        }
    }

    for bucket in buckets.values_mut() {
        bucket.avg_direction = circular_mean(&bucket.direction_samples);
    }

    buckets
}

/// Builds heatmap grids for a fixed layout
#[derive(Debug, Clone)]
pub struct GridAggregator<Tz: TimeZone> {
    tz: Tz,
    interval: IntervalHours,
    days: u32,
    time_format: TimeFormat,
}

impl<Tz: TimeZone> GridAggregator<Tz> {
    /// `days` must already be validated to lie in 1..=30
    pub fn new(tz: Tz, interval: IntervalHours, days: u32, time_format: TimeFormat) -> Self {
        assert!(
            (1..=MAX_DAYS).contains(&days),
            "day span must be between 1 and {MAX_DAYS}, got {days}"
        );
        Self {
            tz,
            interval,
            days,
            time_format,
        }
    }

    pub fn interval(&self) -> IntervalHours {
        self.interval
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    pub fn timezone(&self) -> &Tz {
        &self.tz
    }

    /// Column dates starting at the local date of `window_start`
    pub fn dates(&self, window_start: &DateTime<Utc>) -> Vec<NaiveDate> {
        let first = date_key(window_start, &self.tz);
        (0..self.days)
            .filter_map(|d| first.checked_add_days(Days::new(d as u64)))
            .collect()
    }

    /// Aggregate both series into a full grid plus summary stats
    pub fn aggregate(
        &self,
        speed: &[RawSample],
        direction: &[RawSample],
        window_start: &DateTime<Utc>,
        partial: Option<BucketKey>,
    ) -> HeatmapData {
        let buckets = bucket_samples(speed, direction, &self.tz, self.interval);
        let dates = self.dates(window_start);

        let mut speeds = Vec::new();
        let rows: Vec<Row> = self
            .interval
            .row_hours()
            .map(|hour| {
                let cells = dates
                    .iter()
                    .map(|&date| {
                        let key = BucketKey::new(date, hour);
                        let bucket = buckets.get(&key);
                        let speed = bucket.and_then(|b| b.max_speed);
                        if let Some(s) = speed {
                            speeds.push(s);
                        }
                        Cell {
                            date,
                            speed,
                            direction: bucket.and_then(|b| b.avg_direction),
                            has_data: speed.is_some(),
                            is_partial: partial == Some(key),
                        }
                    })
                    .collect();
                Row {
                    hour,
                    label: hour_label(hour, self.time_format),
                    cells,
                }
            })
            .collect();

        debug!(
            speed_samples = speed.len(),
            direction_samples = direction.len(),
            buckets = buckets.len(),
            filled_cells = speeds.len(),
            "aggregated heatmap grid"
        );

        HeatmapData {
            grid: Grid { dates, rows },
            stats: Stats::from_speeds(&speeds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(h: u32, m: u32, value: &str) -> RawSample {
        RawSample::new(Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap(), value)
    }

    fn window_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_grid_shape_for_every_interval() {
        for interval in IntervalHours::ALL {
            for days in [1, 7, 30] {
                let aggregator = GridAggregator::new(Utc, interval, days, TimeFormat::TwentyFour);
                let data = aggregator.aggregate(&[], &[], &window_start(), None);

                assert_eq!(data.grid.rows.len(), 24 / interval.hours() as usize);
                assert_eq!(data.grid.dates.len(), days as usize);
                assert!(data
                    .grid
                    .rows
                    .iter()
                    .all(|row| row.cells.len() == days as usize));
            }
        }
    }

    #[test]
    fn test_bucket_keeps_maximum_speed() {
        let speed = vec![at(6, 0, "3.5"), at(6, 20, "9.25"), at(7, 59, "4.0")];
        let buckets = bucket_samples(&speed, &[], &Utc, IntervalHours::Two);

        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[&BucketKey::new(date(2024, 3, 1), 6)];
        assert_eq!(bucket.max_speed, Some(9.25));
    }

    #[test]
    fn test_unparseable_samples_are_skipped() {
        let speed = vec![at(1, 0, "unavailable"), at(3, 0, "2"), at(3, 10, "unknown")];
        let buckets = bucket_samples(&speed, &[], &Utc, IntervalHours::One);

        assert_eq!(buckets.len(), 1);
        assert_eq!(
            buckets[&BucketKey::new(date(2024, 3, 1), 3)].max_speed,
            Some(2.0)
        );
    }

    #[test]
    fn test_direction_without_speed_is_dropped() {
        let speed = vec![at(0, 30, "5")];
        let direction = vec![at(0, 40, "350"), at(0, 50, "10"), at(4, 0, "90")];
        let buckets = bucket_samples(&speed, &direction, &Utc, IntervalHours::Two);

        assert_eq!(buckets.len(), 1);
        let bucket = &buckets[&BucketKey::new(date(2024, 3, 1), 0)];
        assert_eq!(bucket.direction_samples, vec![350.0, 10.0]);
        assert!(bucket.avg_direction.unwrap() < 1e-6);
        assert!(!buckets.contains_key(&BucketKey::new(date(2024, 3, 1), 4)));

        let aggregator = GridAggregator::new(Utc, IntervalHours::Two, 1, TimeFormat::TwentyFour);
        let data = aggregator.aggregate(&speed, &direction, &window_start(), None);
        let cell = &data.grid.row_for_hour(4).unwrap().cells[0];
        assert!(!cell.has_data);
        assert_eq!(cell.direction, None);
    }

    #[test]
    fn test_end_to_end_two_hour_buckets() {
        let speed = vec![at(1, 0, "5"), at(1, 30, "8"), at(3, 0, "2")];
        let aggregator = GridAggregator::new(Utc, IntervalHours::Two, 1, TimeFormat::TwentyFour);
        let data = aggregator.aggregate(&speed, &[], &window_start(), None);

        assert_eq!(data.grid.rows.len(), 12);
        for row in &data.grid.rows {
            let cell = &row.cells[0];
            match row.hour {
                0 => {
                    assert_eq!(cell.speed, Some(8.0));
                    assert!(cell.has_data);
                }
                2 => {
                    assert_eq!(cell.speed, Some(2.0));
                    assert!(cell.has_data);
                }
                _ => {
                    assert!(!cell.has_data);
                    assert_eq!(cell.speed, None);
                }
            }
        }
        assert_eq!(
            data.stats,
            Stats {
                min: 2.0,
                max: 8.0,
                avg: 5.0
            }
        );
    }

    #[test]
    fn test_empty_input_yields_zeroed_stats() {
        let aggregator = GridAggregator::new(Utc, IntervalHours::Four, 3, TimeFormat::TwentyFour);
        let data = aggregator.aggregate(&[], &[], &window_start(), None);

        assert!(data.grid.cells().all(|c| !c.has_data && !c.is_partial));
        assert_eq!(data.stats, Stats::default());
    }

    #[test]
    fn test_partial_bucket_marked_once() {
        let speed = vec![at(12, 5, "4"), at(14, 5, "6")];
        let partial = BucketKey::new(date(2024, 3, 1), 14);
        let aggregator = GridAggregator::new(Utc, IntervalHours::Two, 2, TimeFormat::TwentyFour);
        let data = aggregator.aggregate(&speed, &[], &window_start(), Some(partial));

        let partial_cells: Vec<&Cell> = data.grid.cells().filter(|c| c.is_partial).collect();
        assert_eq!(partial_cells.len(), 1);
        assert_eq!(partial_cells[0].date, date(2024, 3, 1));
        assert_eq!(partial_cells[0].speed, Some(6.0));
    }

    #[test]
    fn test_local_time_columns_and_rows() {
        // UTC+10: 2024-02-29T15:00Z is 01:00 on 1 March local time
        let tz = FixedOffset::east_opt(10 * 3600).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 2, 29, 14, 0, 0).unwrap();
        let speed = vec![
            RawSample::new(Utc.with_ymd_and_hms(2024, 2, 29, 15, 0, 0).unwrap(), "7"),
            RawSample::new(Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap(), "3"),
        ];
        let aggregator = GridAggregator::new(tz, IntervalHours::Six, 2, TimeFormat::Twelve);
        let data = aggregator.aggregate(&speed, &[], &start, None);

        assert_eq!(data.grid.dates, vec![date(2024, 3, 1), date(2024, 3, 2)]);
        let night = data.grid.row_for_hour(0).unwrap();
        assert_eq!(night.label, "12a");
        assert_eq!(night.cells[0].speed, Some(7.0));
        assert_eq!(night.cells[1].speed, Some(3.0));
    }

    #[test]
    fn test_dates_cross_month_end() {
        let aggregator = GridAggregator::new(Utc, IntervalHours::TwentyFour, 3, TimeFormat::TwentyFour);
        let start = Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap();
        assert_eq!(
            aggregator.dates(&start),
            vec![date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]
        );
    }

    #[test]
    #[should_panic(expected = "day span")]
    fn test_rejects_zero_days() {
        GridAggregator::new(Utc, IntervalHours::Two, 0, TimeFormat::TwentyFour);
    }
}
