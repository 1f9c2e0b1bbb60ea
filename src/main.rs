//! Peerpulse - Anonymous 360-Degree Peer Evaluation Backend
//!
//! Main entry point: parses the CLI, initializes tracing, validates the
//! configuration (the process refuses to start without a usable
//! encryption key), and serves the HTTP API.

use clap::{Parser, Subcommand};
use peerpulse::{
    error::Result, ApiServer, ApiServerConfig, ConnectionMode, FieldKey, LibsqlStorage, Settings,
};
use std::sync::Arc;
use tracing::{debug, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "peerpulse")]
#[command(about = "Anonymous 360-degree peer evaluation backend", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Database path (overrides the configured default)
    #[arg(long)]
    db_path: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server (the default when no command is given)
    Serve {
        /// Bind address (overrides the configured default)
        #[arg(long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Use the requested level for peerpulse, but keep noisy externals at warn.
    let filter = EnvFilter::new(format!(
        "peerpulse={},tower_http=warn,hyper=warn",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    debug!("Peerpulse v{} starting...", env!("CARGO_PKG_VERSION"));

    // Fails fast when ENCRYPTION_KEY is missing or too short.
    let settings = Settings::load()?;

    let addr_override = match cli.command {
        Some(Commands::Serve { addr }) => addr,
        None => None,
    };

    serve(settings, cli.db_path, addr_override).await
}

async fn serve(
    settings: Settings,
    db_path: Option<String>,
    addr: Option<String>,
) -> Result<()> {
    let db_path = db_path.unwrap_or_else(|| settings.database.path.clone());
    let addr = addr.unwrap_or_else(|| settings.server.addr.clone());

    let addr = addr.parse().map_err(|e| {
        peerpulse::PeerpulseError::Config(config::ConfigError::Message(format!(
            "invalid bind address '{}': {}",
            addr, e
        )))
    })?;

    let master_key = FieldKey::derive(settings.encryption_key());
    let storage = Arc::new(
        LibsqlStorage::connect(ConnectionMode::Local(db_path), master_key).await?,
    );

    let server = ApiServer::new(ApiServerConfig { addr }, storage);
    server.serve().await?;
    Ok(())
}
