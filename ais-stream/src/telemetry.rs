use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt};
use tracker_core::LogLevel;

/// Installs the global fmt subscriber, `RUST_LOG` takes precedence over `level`.
pub fn init_tracer(level: LogLevel) {
    fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .init();
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from(tracing::Level::from(level)).into())
        .from_env_lossy()
}
