//! Demo server: mounts the lifecycle API routes next to a hello-world root
//! and runs until a shutdown trigger (OS signal or authenticated POST) lands.

use std::path::PathBuf;

use axum::{routing::get, Router};
use clap::Parser;

use graceful_server::config::{load_config, ServerConfig};
use graceful_server::observability::logging;
use graceful_server::Server;

#[derive(Parser)]
#[command(name = "graceful-server")]
#[command(about = "HTTP server with signal- and endpoint-triggered graceful shutdown")]
#[command(version)]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port to bind.
    #[arg(long, default_value = "3000")]
    port: String,

    /// Shutdown endpoint credential; randomly generated when omitted.
    #[arg(long)]
    shutdown_key: Option<String>,

    /// TOML config file; takes precedence over the individual flags.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init("graceful_server=debug,tower_http=debug");

    tracing::info!(version = graceful_server::version(), "graceful-server starting");

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => {
            let mut config = ServerConfig::default();
            config.host = cli.host;
            config.port = cli.port;
            if let Some(key) = cli.shutdown_key {
                config.shutdown_key = key;
            }
            config
        }
    };

    tracing::info!(
        listen_addr = %config.listen_addr(),
        read_timeout_secs = config.read_timeout_secs,
        write_timeout_secs = config.write_timeout_secs,
        "Configuration loaded"
    );

    let server = Server::new(config)?;

    let app = Router::new()
        .route("/", get(hello))
        .merge(server.api_router());

    if let Err(error) = server.run(app).await {
        tracing::error!(error = %error, "Server error");
        return Err(error.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn hello() -> &'static str {
    "Hello, World!"
}
