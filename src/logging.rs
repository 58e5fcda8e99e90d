use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber
///
/// Level comes from `RUST_LOG` (e.g. `RUST_LOG=nanosat_launcher=debug`),
/// defaulting to `info`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

/// Subscriber for tests: debug level, captured by the test harness
///
/// Safe to call from every test; only the first call installs it.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
