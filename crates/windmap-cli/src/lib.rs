use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Local, Utc};
use opentelemetry::{
    metrics::{Counter, MeterProvider},
    KeyValue,
};
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use windmap_config::{HeatmapSettings, Timezone};
use windmap_core::RawSample;
use windmap_fetch::{FetchError, FetchWindow, HeatmapFetcher, SeriesQuery, ViewOffset};

pub mod store;
pub mod view;

pub use store::MemoryStore;
pub use view::HeatmapView;

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    settings: RwLock<HeatmapSettings>,
    store: Arc<MemoryStore>,
    fetcher: HeatmapFetcher<Arc<MemoryStore>>,
}

impl AppState {
    pub async fn settings(&self) -> HeatmapSettings {
        self.settings.read().await.clone()
    }
}

pub fn build_app(settings: HeatmapSettings) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter()
        .with_registry(registry.clone())
        .build()
        .context("failed to build prometheus exporter")?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("windmap-cli");

    let requests_total = meter
        .u64_counter("windmap_requests_total")
        .with_description("Total HTTP requests served")
        .init();

    let store = Arc::new(MemoryStore::with_direction_entities(
        settings.direction_entity.clone(),
    ));
    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        settings: RwLock::new(settings),
        fetcher: HeatmapFetcher::new(Arc::clone(&store)),
        store,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/samples/:entity", post(ingest_samples))
        .route("/api/v1/heatmap", get(heatmap))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

/// Render one view of the heatmap as of `now`
pub async fn render_heatmap(
    state: &AppState,
    offset: ViewOffset,
    now: DateTime<Utc>,
) -> Result<HeatmapView, FetchError> {
    let settings = state.settings().await;
    let window = match settings.timezone {
        Timezone::Local => {
            FetchWindow::compute(now, &Local, offset, settings.days, settings.interval)
        }
        Timezone::Fixed(tz) => {
            FetchWindow::compute(now, &tz, offset, settings.days, settings.interval)
        }
    };
    let query = SeriesQuery {
        speed_entity: settings.entity.clone(),
        direction_entity: settings.active_direction_entity().map(str::to_string),
        data_source: settings.data_source,
        statistic_type: settings.statistic_type,
    };

    let series = state.fetcher.fetch(&query, &window, offset).await?;
    let data = view::aggregate(&settings, &series, &window);
    Ok(HeatmapView::build(&settings, &data, &window, offset))
}

/// Re-render the current view every refresh interval
pub fn spawn_refresh(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = state.settings().await.refresh_interval;
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            match render_heatmap(&state, ViewOffset::CURRENT, Utc::now()).await {
                Ok(view) => tracing::debug!(
                    max = view.stats.max,
                    avg = view.stats.avg,
                    "refreshed current view"
                ),
                Err(FetchError::InFlight) => {}
                Err(e) => tracing::warn!(error = %e, "refresh failed"),
            }
        }
    })
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state
        .requests_total
        .add(1, &[KeyValue::new("route", "healthz")]);
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

#[derive(Deserialize)]
struct IngestQuery {
    unit: Option<String>,
}

async fn ingest_samples(
    State(state): State<Arc<AppState>>,
    Path(entity): Path<String>,
    Query(q): Query<IngestQuery>,
    Json(samples): Json<Vec<RawSample>>,
) -> impl IntoResponse {
    state
        .requests_total
        .add(1, &[KeyValue::new("route", "samples")]);

    let accepted = state.store.append(&entity, samples).await;
    state.fetcher.invalidate().await;

    if let Some(unit) = q.unit.as_deref() {
        let mut settings = state.settings.write().await;
        if settings.entity == entity {
            settings.apply_detected_unit(unit);
        }
    }

    tracing::debug!(%entity, accepted, "samples ingested");
    (
        StatusCode::OK,
        Json(serde_json::json!({"status":"ok","accepted":accepted})),
    )
}

#[derive(Deserialize)]
struct HeatmapQuery {
    offset: Option<i64>,
    /// Render as of this instant instead of the wall clock
    at: Option<DateTime<Utc>>,
}

struct ApiError(FetchError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            FetchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            FetchError::InFlight => StatusCode::CONFLICT,
            FetchError::Provider(_) => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(serde_json::json!({"error": self.0.to_string()})),
        )
            .into_response()
    }
}

async fn heatmap(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HeatmapQuery>,
) -> Result<Json<HeatmapView>, ApiError> {
    state
        .requests_total
        .add(1, &[KeyValue::new("route", "heatmap")]);

    let offset = ViewOffset::new(q.offset.unwrap_or(0));
    let now = q.at.unwrap_or_else(Utc::now);
    match render_heatmap(&state, offset, now).await {
        Ok(view) => Ok(Json(view)),
        Err(e) => {
            tracing::warn!(error = %e, offset = offset.days(), "heatmap render failed");
            Err(ApiError(e))
        }
    }
}
