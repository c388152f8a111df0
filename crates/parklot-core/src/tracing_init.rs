//! Logging setup shared by Parklot binaries.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// `RUST_LOG` when set and valid, otherwise `default_filter`.
fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber.
///
/// `log_json` switches from compact text to one JSON object per line. A
/// second call leaves the first subscriber in place.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let output = if log_json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().compact().boxed()
    };

    let _ = tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(output)
        .try_init();
}
