//! Data source selection and statistics → sample conversion

use crate::window::ViewOffset;
use std::fmt;
use windmap_core::{DataSource, RawSample, StatisticRow, StatisticType};

/// Endpoint that actually answers a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolvedSource {
    History,
    Statistics,
}

impl fmt::Display for ResolvedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedSource::History => write!(f, "history"),
            ResolvedSource::Statistics => write!(f, "statistics"),
        }
    }
}

/// `auto` reads statistics for past views and history for the current one
pub fn resolve_source(source: DataSource, offset: ViewOffset) -> ResolvedSource {
    match source {
        DataSource::History => ResolvedSource::History,
        DataSource::Statistics => ResolvedSource::Statistics,
        DataSource::Auto if offset.is_current() => ResolvedSource::History,
        DataSource::Auto => ResolvedSource::Statistics,
    }
}

/// Turn hourly statistic rows into samples stamped at the hour start.
///
/// `kind` picks the field, falling back to `mean`; rows with neither are
/// dropped.
pub fn statistics_to_samples(rows: &[StatisticRow], kind: StatisticType) -> Vec<RawSample> {
    rows.iter()
        .filter_map(|row| {
            let value = row.value(kind).or(row.mean)?;
            Some(RawSample::new(row.start, value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn row(hour: u32, mean: Option<f64>, max: Option<f64>) -> StatisticRow {
        StatisticRow {
            start: Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap(),
            mean,
            min: None,
            max,
        }
    }

    #[test]
    fn test_resolve_source() {
        let past = ViewOffset::new(-7);
        assert_eq!(resolve_source(DataSource::Auto, ViewOffset::CURRENT), ResolvedSource::History);
        assert_eq!(resolve_source(DataSource::Auto, past), ResolvedSource::Statistics);
        assert_eq!(resolve_source(DataSource::History, past), ResolvedSource::History);
        assert_eq!(
            resolve_source(DataSource::Statistics, ViewOffset::CURRENT),
            ResolvedSource::Statistics
        );
    }

    #[test]
    fn test_statistics_conversion() {
        let rows = vec![
            row(0, Some(3.0), Some(9.5)),
            row(1, Some(4.0), None),
            row(2, None, None),
        ];

        let max = statistics_to_samples(&rows, StatisticType::Max);
        assert_eq!(max.len(), 2);
        assert_eq!(max[0].value(), Some(9.5));
        assert_eq!(max[1].value(), Some(4.0));
        assert_eq!(max[1].timestamp, rows[1].start);

        let mean = statistics_to_samples(&rows, StatisticType::Mean);
        assert_eq!(mean[0].value(), Some(3.0));
    }
}
