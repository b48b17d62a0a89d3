//! `tracing-subscriber` setup driven by `--log-level`.

use awf_types::config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub fn init(level: LogLevel) {
    let level = level.as_str();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("awf={level},awf_runtime={level},awf_network={level}")
                    .parse()
                    .unwrap()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
