//! Telemetry and structured logging setup.
//!
//! Verbosity is controlled by `RUST_LOG`; the output format by `LOG_FORMAT`
//! (see [`crate::config::LogFormat`]).

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LogFormat;

/// Used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "info,welcome_bot=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initializes compact human-readable logging.
///
/// Example RUST_LOG values:
/// - `info` - All info and above
/// - `welcome_bot=debug` - Debug for this crate, default for others
/// - `welcome_bot=trace,reqwest=warn` - Trace for us, warn for the HTTP client
pub fn init_telemetry() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initializes JSON logging, one object per line, for log collectors.
pub fn init_telemetry_json() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
        .init();
}

/// Initializes logging in the requested format.
pub fn init_with_format(format: LogFormat) {
    match format {
        LogFormat::Pretty => init_telemetry(),
        LogFormat::Json => init_telemetry_json(),
    }
}
