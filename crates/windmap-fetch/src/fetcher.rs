//! Speed/direction series fetching with caching, timeouts and de-duplication

use crate::cache::{CacheKey, ResponseCache, DEFAULT_CACHE_TTL};
use crate::source::{resolve_source, statistics_to_samples, ResolvedSource};
use crate::window::{FetchWindow, ViewOffset};
use crate::{FetchError, FetchResult};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::PoisonError;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use windmap_core::{DataSource, RawSample, SampleProvider, StatisticType};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// What to fetch for one heatmap
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesQuery {
    pub speed_entity: String,
    /// `None` when direction display is off
    pub direction_entity: Option<String>,
    pub data_source: DataSource,
    pub statistic_type: StatisticType,
}

/// Both series of one view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesPair {
    pub speed: Vec<RawSample>,
    pub direction: Vec<RawSample>,
}

#[derive(Debug, Clone, Copy)]
pub struct FetcherOptions {
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

/// Identity of one view state: what is shown and where the window sits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ViewKey {
    query: SeriesQuery,
    offset: i64,
    start: DateTime<Utc>,
    cache_end: DateTime<Utc>,
}

/// Views with a fetch running
#[derive(Debug, Default)]
struct InFlight(std::sync::Mutex<HashSet<ViewKey>>);

impl InFlight {
    fn claim(&self, key: ViewKey) -> Option<InFlightGuard<'_>> {
        let mut views = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if !views.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard { set: self, key })
    }

    fn is_empty(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

/// Releases a view's in-flight slot when its fetch ends, even if it is cancelled
struct InFlightGuard<'a> {
    set: &'a InFlight,
    key: ViewKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

/// Fetches heatmap series from a provider
pub struct HeatmapFetcher<P> {
    provider: P,
    timeout: Duration,
    cache: Mutex<ResponseCache<Vec<RawSample>>>,
    in_flight: InFlight,
}

impl<P: SampleProvider> HeatmapFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, FetcherOptions::default())
    }

    pub fn with_options(provider: P, options: FetcherOptions) -> Self {
        Self {
            provider,
            timeout: options.timeout,
            cache: Mutex::new(ResponseCache::new(options.cache_ttl)),
            in_flight: InFlight::default(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Whether any view is being fetched
    pub fn is_fetching(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub async fn cached_responses(&self) -> usize {
        self.cache.lock().await.len()
    }

    /// Drop all cached responses, e.g. after new samples arrive
    pub async fn invalidate(&self) {
        self.cache.lock().await.clear();
    }

    /// Fetch both series for a window.
    ///
    /// Only one fetch runs per view state; a concurrent call for the same
    /// view fails with [`FetchError::InFlight`] without reaching the
    /// provider. Different views fetch independently.
    pub async fn fetch(
        &self,
        query: &SeriesQuery,
        window: &FetchWindow,
        offset: ViewOffset,
    ) -> FetchResult<SeriesPair> {
        let view = ViewKey {
            query: query.clone(),
            offset: offset.days(),
            start: window.start,
            cache_end: window.cache_end,
        };
        let Some(_guard) = self.in_flight.claim(view) else {
            warn!(
                entity = %query.speed_entity,
                offset = offset.days(),
                "fetch for this view already in progress, skipping"
            );
            return Err(FetchError::InFlight);
        };

        let started = Instant::now();
        let source = resolve_source(query.data_source, offset);
        info!(
            entity = %query.speed_entity,
            direction_entity = ?query.direction_entity,
            %source,
            offset = offset.days(),
            start = %window.start,
            end = %window.end,
            "fetching heatmap series"
        );

        let speed = self.fetch_series(
            &query.speed_entity,
            source,
            query.statistic_type,
            window,
            offset,
        );
        let direction = async {
            match &query.direction_entity {
                Some(entity) => {
                    self.fetch_series(entity, source, StatisticType::Mean, window, offset)
                        .await
                }
                None => Ok(Vec::new()),
            }
        };
        let (speed, direction) = tokio::join!(speed, direction);
        let pair = SeriesPair {
            speed: speed?,
            direction: direction?,
        };

        info!(
            speed_samples = pair.speed.len(),
            direction_samples = pair.direction.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fetched heatmap series"
        );
        Ok(pair)
    }

    async fn fetch_series(
        &self,
        entity: &str,
        source: ResolvedSource,
        kind: StatisticType,
        window: &FetchWindow,
        offset: ViewOffset,
    ) -> FetchResult<Vec<RawSample>> {
        let query = match source {
            ResolvedSource::History => format!("{source}:{entity}"),
            ResolvedSource::Statistics => format!("{source}:{entity}:{kind:?}"),
        };
        let key = CacheKey {
            query,
            start: window.start,
            end: window.cache_end,
            offset: offset.days(),
        };

        if let Some(hit) = self.cache.lock().await.get(&key) {
            debug!(query = %key.query, "cache hit");
            return Ok(hit);
        }

        let samples = match source {
            ResolvedSource::History => {
                self.bounded(self.provider.history(entity, window.start, window.end))
                    .await?
            }
            ResolvedSource::Statistics => {
                let rows = self
                    .bounded(self.provider.statistics(entity, window.start, window.end))
                    .await?;
                statistics_to_samples(&rows, kind)
            }
        };

        self.cache.lock().await.insert(key, samples.clone());
        Ok(samples)
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> FetchResult<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(FetchError::Provider),
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        }
    }
}
