use tracing_subscriber::{fmt, EnvFilter};

/// Initialize logging to stderr, filtered by `RUST_LOG` (default `info`).
///
/// Stdout is left to the `--json` sensation stream.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
