//! Stderr logging setup.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber writing compact lines to stderr.
///
/// `RUST_LOG` takes precedence over `level`. Stdout stays reserved for the
/// composed bundle. Subsequent calls are no-ops.
pub(crate) fn init_subscriber(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}
