use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use windmap_obs::LogFormat;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging
    windmap_obs::init("windmapd", LogFormat::from_env());

    // Config
    let cfg = windmap_config::AppConfig::load().context("failed to load configuration")?;
    let http_bind = cfg.http_bind();
    let settings = cfg.card.validate().context("invalid heatmap configuration")?;
    tracing::info!(
        entity = %settings.entity,
        days = settings.days,
        interval = settings.interval.hours(),
        "heatmap configured"
    );

    // Build app and state
    let (app, state) = windmap_cli::build_app(settings)?;

    // Keep the current view warm
    let _refresh = windmap_cli::spawn_refresh(state.clone());

    // Start HTTP server
    let addr: SocketAddr = http_bind
        .parse()
        .with_context(|| format!("invalid HTTP bind address {http_bind:?}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    // Mark ready just before serving
    windmap_cli::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
