//! Server command - start the HTTP API
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: configure_server(), start_server()
//! - Level 3: (delegated to hexlands-server crate)
//! - Level 4: configuration validation

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use hexlands_server::{run_server, ServerConfig};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct ServerArgs {
    /// Port number to listen on
    #[arg(long, default_value = "8002")]
    pub port: u16,

    /// Directory of static client files to serve alongside the API
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,

    /// Seconds an idempotent response stays replayable
    #[arg(long, default_value = "86400")]
    pub idempotency_ttl_secs: u64,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run server command
///
/// 1. Configure server
/// 2. Start server (blocking)
pub fn run(args: ServerArgs) -> Result<()> {
    let config = configure_server(&args)?;

    tracing::info!("Starting HEXLANDS server on port {}", config.port);

    start_server(config)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

/// Configure server from command arguments
fn configure_server(args: &ServerArgs) -> Result<ServerConfig> {
    anyhow::ensure!(args.idempotency_ttl_secs > 0, "idempotency TTL must be positive");

    let mut config = ServerConfig::default()
        .with_port(args.port)
        .with_idempotency_ttl(Duration::from_secs(args.idempotency_ttl_secs));

    if let Some(dir) = &args.static_dir {
        validate_static_dir(dir)?;
        config = config.with_static_dir(dir.to_string_lossy());
    }

    Ok(config)
}

/// Start the server (blocking)
fn start_server(config: ServerConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async { run_server(config).await })
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Validate that static directory exists
fn validate_static_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        tracing::warn!(
            "Static directory does not exist: {}. Server will start but may not serve files.",
            path.display()
        );
    } else if !path.is_dir() {
        anyhow::bail!("Static path exists but is not a directory: {}", path.display());
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
