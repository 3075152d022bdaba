//! In-memory sample store backing the service

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use windmap_core::{
    rollup_hourly, rollup_hourly_directions, RawSample, SampleProvider, StatisticRow,
};

/// Samples kept per entity; the oldest are dropped first
pub const SAMPLE_CAP: usize = 50_000;

#[derive(Debug, Default)]
pub struct MemoryStore {
    series: RwLock<HashMap<String, Vec<RawSample>>>,
    /// Entities holding compass bearings, rolled up with a circular mean
    directions: HashSet<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_direction_entities<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            directions: entities.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append samples, keeping each series ordered by time
    pub async fn append(&self, entity: &str, mut samples: Vec<RawSample>) -> usize {
        let accepted = samples.len();
        let mut series = self.series.write().await;
        let stored = series.entry(entity.to_string()).or_default();
        stored.append(&mut samples);
        stored.sort_by_key(|s| s.timestamp);
        if stored.len() > SAMPLE_CAP {
            let overflow = stored.len() - SAMPLE_CAP;
            stored.drain(0..overflow);
        }
        accepted
    }

    pub async fn len(&self, entity: &str) -> usize {
        self.series
            .read()
            .await
            .get(entity)
            .map_or(0, |s| s.len())
    }

    async fn range(&self, entity: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<RawSample> {
        let series = self.series.read().await;
        series
            .get(entity)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|s| s.timestamp >= start && s.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl SampleProvider for MemoryStore {
    async fn history(
        &self,
        entity: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawSample>> {
        Ok(self.range(entity, start, end).await)
    }

    async fn statistics(
        &self,
        entity: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StatisticRow>> {
        let samples = self.range(entity, start, end).await;
        if self.directions.contains(entity) {
            Ok(rollup_hourly_directions(&samples))
        } else {
            Ok(rollup_hourly(&samples))
        }
    }
}
