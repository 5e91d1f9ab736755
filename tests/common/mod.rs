//! Shared utilities for integration testing.

use std::time::Duration;

use axum::{routing::get, Router};
use graceful_server::{Server, ServerConfig, ServerError};
use tokio::task::JoinHandle;

/// Build a server on a fixed localhost port and spawn it with the API routes
/// plus a root hello route and a deliberately slow route.
///
/// Returns the base URL and the join handle for the run call.
pub async fn start_server(port: u16, key: &str) -> (String, JoinHandle<Result<(), ServerError>>) {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.port = port.to_string();
    config.shutdown_key = key.to_string();

    let server = Server::new(config).expect("failed to create server");
    let base_url = server.base_url();

    let app = Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                "done"
            }),
        )
        .merge(server.api_router());

    let task = tokio::spawn(async move { server.run(app).await });

    wait_until_ready(&base_url).await;
    (base_url, task)
}

/// Poll the root route until the server accepts connections.
async fn wait_until_ready(base_url: &str) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if client.get(base_url).send().await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server did not become ready at {}", base_url);
}
