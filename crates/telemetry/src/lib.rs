//! Tracing/logging bootstrap.

use tracing_subscriber::EnvFilter;

use shelf_kernel::settings::{LogFormat, TelemetrySettings};

/// Initialize the global tracing subscriber from settings.
///
/// `RUST_LOG` overrides the configured filter directive. Safe to call more
/// than once; later calls are no-ops.
pub fn init(settings: &TelemetrySettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_filter.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let initialized = match settings.log_format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.try_init().is_ok(),
    };

    if initialized {
        tracing::debug!(target: "shelf-telemetry", format = ?settings.log_format, "telemetry initialized");
    }
}
