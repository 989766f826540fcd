//! # Logging Module
//!
//! Structured logging initialization built on `tracing`. Kept separate from
//! the library modules so embedding applications can bring their own
//! subscriber; only the demo binary calls into here.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber
///
/// The filter honors `RUST_LOG` when set and otherwise defaults to info-level
/// output for this crate. `LOG_FORMAT=json` switches to JSON lines for log
/// shippers; anything else keeps the human-readable format.
pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "consul_discovery=info,tower_http=info".into());

    let json_output = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_output {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true).json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .with(filter)
            .init();
    }

    info!("📊 Observability initialized");
}
