//! Subscriber setup for binaries.
//!
//! The library itself only emits `tracing` events; nothing is printed
//! unless a subscriber is installed.
use tracing_subscriber::EnvFilter;

/// Targets that receive log output by default.
const TARGETS: &[&str] = &["epochrank", "rank_epochs"];

/// Default filter directive for a `-v` count.
///
/// 0 → warn, 1 → info, 2 → debug, 3+ → trace.
pub fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    TARGETS.iter().map(|t| format!("{t}={level}")).collect::<Vec<_>>().join(",")
}

/// Install a stderr `fmt` subscriber.  `RUST_LOG` overrides `verbosity`.
///
/// Logs go to stderr so stdout stays machine-readable.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
