use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{RawSample, StatisticRow};

/// Supplier of sensor history.
///
/// Implementations wrap whatever backend stores the readings; the heatmap
/// pipeline only ever reads through this trait.
#[async_trait::async_trait]
pub trait SampleProvider: Send + Sync {
    /// Raw state changes of `entity` between `start` and `end`
    async fn history(
        &self,
        entity: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawSample>>;

    /// Hourly statistics of `entity` between `start` and `end`
    async fn statistics(
        &self,
        entity: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StatisticRow>>;
}

#[async_trait::async_trait]
impl<P: SampleProvider + ?Sized> SampleProvider for Arc<P> {
    async fn history(
        &self,
        entity: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawSample>> {
        (**self).history(entity, start, end).await
    }

    async fn statistics(
        &self,
        entity: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StatisticRow>> {
        (**self).statistics(entity, start, end).await
    }
}
