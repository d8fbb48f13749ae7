// crates/variant-gate-server/src/main.rs
// ============================================================================
// Module: Variant Gate Server Entry Point
// Description: Binary wrapper around the HTTP server.
// Purpose: Parse flags, load configuration, and serve until shutdown.
// Dependencies: clap, tokio, variant-gate-config, variant-gate-server
// ============================================================================

//! ## Overview
//! Thin binary over [`variant_gate_server`]: resolves the configuration file
//! (flag, then environment variable, then default name), builds the server,
//! and serves on the multi-thread runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use variant_gate_config::VariantGateConfig;
use variant_gate_server::ServerError;
use variant_gate_server::VariantGateServer;

// ============================================================================
// SECTION: CLI
// ============================================================================

/// Variant Gate assignment server.
#[derive(Debug, Parser)]
#[command(name = "variant-gate-server", version, about = "Variant Gate assignment server")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Loads configuration and runs the server.
async fn run() -> Result<(), ServerError> {
    let cli = Cli::parse();
    let config = VariantGateConfig::load(cli.config.as_deref())
        .map_err(|err| ServerError::Config(err.to_string()))?;
    let server = VariantGateServer::from_config(config)?;
    server.serve().await
}

/// Writes a fatal error to stderr and returns the failure code.
#[allow(clippy::print_stderr, reason = "Fatal startup errors are reported on stderr.")]
fn emit_error(message: &str) -> ExitCode {
    eprintln!("error: {message}");
    ExitCode::FAILURE
}
