//! Fable - narrative image captioning over a local web UI.
//!
//! Fable starts a web server that accepts image uploads, captions them with
//! a local BLIP model, and rewrites each caption into a single narrative
//! sentence via the Gemini API.
//!
//! # Usage
//!
//! ```bash
//! # Start the server on the default address (127.0.0.1:8000)
//! GEMINI_API_KEY=... fable
//!
//! # Bind elsewhere, with debug logging
//! fable --host 0.0.0.0 --port 9090 --verbose
//! ```
//!
//! The first caption request downloads the BLIP weights (~990MB) into the
//! model cache directory; later requests reuse them.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

mod logging;
mod server;

/// Fable - two-stage narrative image captioning server.
#[derive(Parser, Debug)]
#[command(name = "fable")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the standard location)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to bind the web server to
    #[arg(long)]
    host: Option<String>,

    /// Port to bind the web server to
    #[arg(long)]
    port: Option<u16>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let mut config = match &cli.config {
        Some(path) => fable_core::Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => match fable_core::Config::load() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: Failed to load config: {e}\n  Using default configuration.");
                fable_core::Config::default()
            }
        },
    };

    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Fable v{}", fable_core::VERSION);

    server::run(config).await
}
