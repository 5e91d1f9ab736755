use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "server-cli")]
#[command(about = "Management CLI for graceful-server", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the running server.
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health and uptime
    Health,
    /// Request a graceful shutdown
    Shutdown {
        /// Shutdown credential configured on the server
        key: String,

        /// Poll until the server has stopped accepting connections
        #[arg(long)]
        wait: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/api/health", cli.url)).send().await?;
            report(res).await
        }
        Commands::Shutdown { key, wait } => {
            let res = client
                .post(format!("{}/api/shutdown/{}", cli.url, key))
                .send()
                .await?;
            report(res).await?;
            if wait {
                wait_for_drain(&client, &cli.url).await?;
                println!("Server stopped");
            }
            Ok(())
        }
    }
}

/// Print the response body, or explain the refusal in the server's terms.
async fn report(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if status.is_success() {
        let json: Value = res.json().await?;
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    let reason = match status.as_u16() {
        400 => "wrong HTTP method for this endpoint",
        401 => "shutdown key rejected",
        500 => "server has no shutdown key configured",
        _ => "unexpected response",
    };
    Err(format!("{} ({})", reason, status).into())
}

/// The drain is bounded at ten seconds; poll a little past that before
/// giving up.
async fn wait_for_drain(
    client: &reqwest::Client,
    url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    for _ in 0..24 {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let reply = client.get(format!("{}/api/health", url)).send().await;
        if reply.is_err() {
            return Ok(());
        }
    }
    Err("server still accepting connections after the drain window".into())
}
