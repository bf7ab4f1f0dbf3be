use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Maps a configured level name onto a filter directive, defaulting to `info`
pub fn level_directive(level: Option<&str>) -> &'static str {
    match level.map(|l| l.trim().to_lowercase()).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("warn") | Some("warning") => "warn",
        Some("error") => "error",
        Some("off") => "off",
        _ => "info",
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over the configured level.
///
/// Logs go to stderr so they never interleave with rendered answers.
pub fn init_logging(level: Option<&str>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to set tracing subscriber: {}", e))
}
