//! Logging initialization and configuration.
//!
//! Uses the `tracing` ecosystem for structured logging with support for
//! both human-readable and JSON output formats.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem from configuration plus CLI overrides.
///
/// The configured `logging.level` is applied verbatim and accepts all five
/// tracing levels (error, warn, info, debug, trace). Precedence, highest
/// first: `RUST_LOG`, `--verbose` (raises the level to debug), then the
/// config file.
///
/// Log output goes to stderr; stdout stays clean for shell pipelines.
pub fn init_from_config(
    config: &fable_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let level = effective_level(&config.logging.level, verbose_override);
    let json_format = json_logs_override || config.logging.format == "json";

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// `--verbose` raises the level to debug. A configured `trace` is already
/// more detailed and is kept.
fn effective_level<'a>(configured: &'a str, verbose: bool) -> &'a str {
    if verbose && configured != "trace" {
        "debug"
    } else {
        configured
    }
}
