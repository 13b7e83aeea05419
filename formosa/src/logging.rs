use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise default non-JSON `Formosa` logging.
///
/// The default directive comes from `RUST_LOG` when set, falling back to the provided
/// level (which `Config` feeds from `LOG_LEVEL`).
pub fn init_logging(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(
                    default_level
                        .parse()
                        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO.into()),
                )
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer())
        .init()
}

/// Initialise default JSON `Formosa` logging.
pub fn init_json_logging(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(
                    default_level
                        .parse()
                        .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO.into()),
                )
                .from_env_lossy(),
        )
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init()
}
