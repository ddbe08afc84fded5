//! Log output configuration.
//!
//! Development gets pretty, colored output at `debug`; production gets
//! flattened JSON at `info` for log aggregation. `RUST_LOG` overrides either
//! default (e.g. `RUST_LOG=kards_api=trace,tower_http=debug`).

use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Environment;

const DEVELOPMENT_FILTER: &str = "debug,tower_http=debug,sqlx=warn";
const PRODUCTION_FILTER: &str = "info,tower_http=info,sqlx=warn";

/// Install the global subscriber. Call once at startup.
pub fn init_tracing(env: &Environment) {
    if env.is_development() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .pretty()
                    .with_filter(env_filter(DEVELOPMENT_FILTER)),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .flatten_event(true)
                    .with_target(true)
                    .with_filter(env_filter(PRODUCTION_FILTER)),
            )
            .init();
    }

    ::tracing::info!(environment = ?env, "Tracing initialized");
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}
