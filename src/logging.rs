use tracing_subscriber::EnvFilter;

/// Install the global subscriber, writing to stderr (stdout carries command
/// output and JSON responses). `RUST_LOG` wins over `default_directive`; an
/// unparseable directive falls back to `warn`.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
