//! Logging setup
//!
//! Each ask runs inside an `ask` span carrying the asking user's id, so
//! every line logged while answering names the user. Closing that span
//! records how long the answer took.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
fn default_directives(log_level: &str) -> String {
    format!(
        "{lvl},fractonix_engine={lvl},fractonix={lvl},tower_http={lvl}",
        lvl = log_level
    )
}

/// Install the global subscriber at `log_level` unless `RUST_LOG` overrides it.
///
/// Debug builds print for a terminal; release builds emit one JSON object
/// per line with the enclosing spans attached. Later calls are no-ops.
pub fn init_telemetry_with_level(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    #[cfg(debug_assertions)]
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_span_events(FmtSpan::CLOSE);

    #[cfg(not(debug_assertions))]
    let layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_cover_crate_and_http_layer() {
        let directives = default_directives("debug");
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("fractonix_engine=debug"));
        assert!(directives.contains("tower_http=debug"));
        EnvFilter::try_new(&directives).unwrap();
    }
}
