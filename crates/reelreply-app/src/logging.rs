use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_DIRECTIVE: &str = "info";

/// Filter from a `RUST_LOG`-style string, falling back to `info` when the
/// value is absent, blank or unparsable.
pub fn build_env_filter(raw: Option<&str>) -> EnvFilter {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directive) => EnvFilter::try_new(directive).unwrap_or_else(|_| {
            eprintln!("Ignoring invalid RUST_LOG value: {directive}");
            EnvFilter::new(DEFAULT_LOG_DIRECTIVE)
        }),
        None => EnvFilter::new(DEFAULT_LOG_DIRECTIVE),
    }
}

/// Plain-text, line-per-event logging on stdout.
pub fn init_console_logging() {
    let raw = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(raw.as_deref()))
        .with_ansi(false)
        .with_target(false)
        .with_writer(std::io::stdout)
        .init();
}
