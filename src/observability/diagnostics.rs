//! Diagnostic tracing setup.
//!
//! Operator-facing progress goes through [`super::RunLog`]; this is the
//! developer channel (stage spans, tool command lines, timings) on stderr.

use tracing_subscriber::EnvFilter;

/// Environment variable overriding the filter, e.g. `ASMQC_LOG=asmqc=debug`.
pub const LOG_ENV: &str = "ASMQC_LOG";

/// Default filter directive for a `-v` count.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
