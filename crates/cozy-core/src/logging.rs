//! Tracing subscriber setup for embedding hosts.
//!
//! This workspace is a library core; the host calls [`init`] once at
//! startup, usually with `CozyConfig.general.log_level`.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; `default_directive` applies when it is
/// unset. Safe to call more than once: later calls are no-ops.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
