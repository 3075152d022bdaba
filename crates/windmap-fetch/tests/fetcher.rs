use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use tokio::sync::Notify;
use windmap_core::{DataSource, IntervalHours, RawSample, SampleProvider, StatisticRow, StatisticType};
use windmap_fetch::{
    FetchError, FetchWindow, FetcherOptions, HeatmapFetcher, SeriesQuery, ViewOffset,
};

#[derive(Default)]
struct MockProvider {
    history_calls: AtomicUsize,
    statistics_calls: AtomicUsize,
    delay: Option<Duration>,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    fail: bool,
}

#[async_trait::async_trait]
impl SampleProvider for MockProvider {
    async fn history(
        &self,
        entity: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<RawSample>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("backend unavailable");
        }
        let value = if entity.contains("direction") { "270" } else { "12.5" };
        Ok(vec![RawSample::new(start, value)])
    }

    async fn statistics(
        &self,
        _entity: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<StatisticRow>> {
        self.statistics_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![StatisticRow {
            start,
            mean: Some(4.0),
            min: Some(1.0),
            max: Some(9.0),
        }])
    }
}

fn query(direction: bool) -> SeriesQuery {
    SeriesQuery {
        speed_entity: "sensor.wind_speed".into(),
        direction_entity: direction.then(|| "sensor.wind_direction".into()),
        data_source: DataSource::Auto,
        statistic_type: StatisticType::Max,
    }
}

fn window(offset: ViewOffset) -> FetchWindow {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    FetchWindow::compute(now, &Utc, offset, 7, IntervalHours::Two)
}

#[tokio::test]
async fn fetches_speed_and_direction_from_history() {
    let fetcher = HeatmapFetcher::new(MockProvider::default());
    let pair = fetcher
        .fetch(&query(true), &window(ViewOffset::CURRENT), ViewOffset::CURRENT)
        .await
        .unwrap();

    assert_eq!(pair.speed[0].value(), Some(12.5));
    assert_eq!(pair.direction[0].value(), Some(270.0));
    assert_eq!(fetcher.provider().history_calls.load(Ordering::SeqCst), 2);
    assert!(!fetcher.is_fetching());
}

#[tokio::test]
async fn direction_skipped_without_entity() {
    let fetcher = HeatmapFetcher::new(MockProvider::default());
    let pair = fetcher
        .fetch(&query(false), &window(ViewOffset::CURRENT), ViewOffset::CURRENT)
        .await
        .unwrap();

    assert!(pair.direction.is_empty());
    assert_eq!(fetcher.provider().history_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn past_views_use_statistics() {
    let fetcher = HeatmapFetcher::new(MockProvider::default());
    let offset = ViewOffset::CURRENT.back(7);
    let pair = fetcher
        .fetch(&query(true), &window(offset), offset)
        .await
        .unwrap();

    // max for speed, mean for direction
    assert_eq!(pair.speed[0].value(), Some(9.0));
    assert_eq!(pair.direction[0].value(), Some(4.0));
    assert_eq!(fetcher.provider().statistics_calls.load(Ordering::SeqCst), 2);
    assert_eq!(fetcher.provider().history_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn repeated_fetch_is_served_from_cache() {
    let fetcher = HeatmapFetcher::new(MockProvider::default());
    let offset = ViewOffset::CURRENT.back(7);
    let win = window(offset);

    fetcher.fetch(&query(false), &win, offset).await.unwrap();
    fetcher.fetch(&query(false), &win, offset).await.unwrap();
    assert_eq!(fetcher.provider().statistics_calls.load(Ordering::SeqCst), 1);

    fetcher.invalidate().await;
    fetcher.fetch(&query(false), &win, offset).await.unwrap();
    assert_eq!(fetcher.provider().statistics_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn current_view_refetch_within_bucket_hits_cache() {
    let fetcher = HeatmapFetcher::new(MockProvider::default());
    let bucket_start = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();

    for second in 0..100 {
        let now = bucket_start + ChronoDuration::seconds(second);
        let win = FetchWindow::compute(now, &Utc, ViewOffset::CURRENT, 7, IntervalHours::Two);
        fetcher
            .fetch(&query(false), &win, ViewOffset::CURRENT)
            .await
            .unwrap();
    }

    assert_eq!(fetcher.provider().history_calls.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.cached_responses().await, 1);

    // next bucket is a new view state
    let later = bucket_start + ChronoDuration::hours(2);
    let win = FetchWindow::compute(later, &Utc, ViewOffset::CURRENT, 7, IntervalHours::Two);
    fetcher.fetch(&query(false), &win, ViewOffset::CURRENT).await.unwrap();
    assert_eq!(fetcher.provider().history_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn navigation_change_misses_cache() {
    let fetcher = HeatmapFetcher::new(MockProvider::default());
    let one_back = ViewOffset::CURRENT.back(7);
    let two_back = one_back.back(7);

    fetcher.fetch(&query(false), &window(one_back), one_back).await.unwrap();
    fetcher.fetch(&query(false), &window(two_back), two_back).await.unwrap();
    assert_eq!(fetcher.provider().statistics_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn slow_provider_times_out() {
    let provider = MockProvider {
        delay: Some(Duration::from_secs(5)),
        ..MockProvider::default()
    };
    let fetcher = HeatmapFetcher::with_options(
        provider,
        FetcherOptions {
            timeout: Duration::from_millis(50),
            ..FetcherOptions::default()
        },
    );

    let err = fetcher
        .fetch(&query(false), &window(ViewOffset::CURRENT), ViewOffset::CURRENT)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_millis(50)));
    assert!(!fetcher.is_fetching());
}

#[tokio::test]
async fn provider_errors_propagate() {
    let provider = MockProvider {
        fail: true,
        ..MockProvider::default()
    };
    let fetcher = HeatmapFetcher::new(provider);

    let err = fetcher
        .fetch(&query(false), &window(ViewOffset::CURRENT), ViewOffset::CURRENT)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Provider(_)));
    assert!(err.to_string().contains("backend unavailable"));
}

#[tokio::test]
async fn concurrent_fetch_is_rejected() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let provider = MockProvider {
        gate: Some((Arc::clone(&entered), Arc::clone(&release))),
        ..MockProvider::default()
    };
    let fetcher = Arc::new(HeatmapFetcher::new(provider));

    let first = {
        let fetcher = Arc::clone(&fetcher);
        tokio::spawn(async move {
            fetcher
                .fetch(&query(false), &window(ViewOffset::CURRENT), ViewOffset::CURRENT)
                .await
        })
    };
    entered.notified().await;
    assert!(fetcher.is_fetching());

    let second = fetcher
        .fetch(&query(false), &window(ViewOffset::CURRENT), ViewOffset::CURRENT)
        .await;
    assert!(matches!(second, Err(FetchError::InFlight)));

    release.notify_one();
    assert!(first.await.unwrap().is_ok());
    assert_eq!(fetcher.provider().history_calls.load(Ordering::SeqCst), 1);
    assert!(!fetcher.is_fetching());
}

#[tokio::test]
async fn different_views_fetch_concurrently() {
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let provider = MockProvider {
        gate: Some((Arc::clone(&entered), Arc::clone(&release))),
        ..MockProvider::default()
    };
    let fetcher = Arc::new(HeatmapFetcher::new(provider));

    let current = {
        let fetcher = Arc::clone(&fetcher);
        tokio::spawn(async move {
            fetcher
                .fetch(&query(false), &window(ViewOffset::CURRENT), ViewOffset::CURRENT)
                .await
        })
    };
    entered.notified().await;

    // a past view is a different view state and is not held up
    let past = ViewOffset::CURRENT.back(7);
    let pair = fetcher.fetch(&query(false), &window(past), past).await.unwrap();
    assert_eq!(pair.speed[0].value(), Some(9.0));
    assert!(fetcher.is_fetching());

    release.notify_one();
    assert!(current.await.unwrap().is_ok());
    assert!(!fetcher.is_fetching());
}
