use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,windmap=debug";

/// Log line shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

impl LogFormat {
    /// `WINDMAP_LOG_FORMAT=pretty` switches to human readable output
    pub fn from_env() -> Self {
        match std::env::var("WINDMAP_LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

fn filter_directive() -> String {
    std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string())
}

/// Initialize logging.
/// - JSON logs by default, one object per line
/// - RUST_LOG respected; default to "info,windmap=debug"
/// - safe to call more than once; later calls are no-ops
pub fn init(service_name: &str, format: LogFormat) {
    let env_filter = EnvFilter::new(filter_directive());
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };

    if installed.is_ok() {
        tracing::info!(service = %service_name, ?format, "Logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let _ = EnvFilter::new(DEFAULT_FILTER);
        assert!(DEFAULT_FILTER.contains("windmap=debug"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init("windmap-test", LogFormat::Pretty);
        init("windmap-test", LogFormat::Json);
    }
}
