//! HTTP server setup and the accept/serve loop.
//!
//! # Responsibilities
//! - Resolve the shutdown credential and expose the lifecycle API router
//! - Bind the listener and run the accept loop on its own task
//! - Apply protocol limits per connection (header size, read deadline)
//! - Wire up middleware (write deadline, body limit, tracing)
//! - Hand the serve loop to the shutdown coordinator for the bounded drain

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::http::handlers::{api_router, AppState};
use crate::lifecycle::{ServeHandle, ShutdownCoordinator, ShutdownError, ShutdownTrigger};

/// Error type for server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Signal handler installation failed at construction.
    #[error("Failed to register signal handlers: {0}")]
    Signals(std::io::Error),

    /// The listen address could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// The drain after a shutdown trigger did not complete cleanly.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}

/// HTTP server with graceful shutdown built in.
///
/// Composes the configuration, the lifecycle clock and the shutdown
/// coordinator. `run` serves a router until the first trigger arrives, then
/// drains in-flight requests within the fixed window.
pub struct Server {
    config: ServerConfig,
    shutdown_key: Arc<str>,
    started: Arc<OnceLock<Instant>>,
    coordinator: ShutdownCoordinator,
}

impl Server {
    /// Create a new server from `config`.
    ///
    /// A random shutdown key is generated when the config does not set one,
    /// so the shutdown endpoint fails closed rather than open.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        Self::with_context(config, CancellationToken::new())
    }

    /// Like [`Server::new`], with a caller-supplied base cancellation token
    /// bounding the drain in addition to the fixed timeout.
    pub fn with_context(
        config: ServerConfig,
        base: CancellationToken,
    ) -> Result<Self, ServerError> {
        let coordinator =
            ShutdownCoordinator::with_context(base).map_err(ServerError::Signals)?;

        let shutdown_key: Arc<str> = if config.shutdown_key.is_empty() {
            Arc::from(Uuid::new_v4().to_string())
        } else {
            Arc::from(config.shutdown_key.as_str())
        };

        Ok(Self {
            config,
            shutdown_key,
            started: Arc::new(OnceLock::new()),
            coordinator,
        })
    }

    /// Base URL clients can reach the server at, assuming plain HTTP.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.config.listen_addr())
    }

    /// The credential the shutdown endpoint accepts.
    pub fn shutdown_key(&self) -> &str {
        &self.shutdown_key
    }

    /// A sender for this server's shutdown channel.
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        self.coordinator.trigger()
    }

    /// Router with the lifecycle API routes mounted (`/api/health`,
    /// `/api/shutdown/{key}`); merge it into the application router.
    pub fn api_router(&self) -> Router {
        api_router(AppState {
            started: self.started.clone(),
            shutdown_key: self.shutdown_key.clone(),
            trigger: self.coordinator.trigger(),
        })
    }

    /// Serve `app` until a shutdown trigger arrives, then drain.
    ///
    /// Blocks the calling task. The accept loop runs on its own task so the
    /// shutdown wait never interferes with serving.
    pub async fn run(self, app: Router) -> Result<(), ServerError> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;

        // The lifecycle clock starts when serving begins, not at construction.
        let _ = self.started.set(Instant::now());

        tracing::info!(url = %self.base_url(), "HTTP server starting");

        let app = app
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.write_timeout_secs,
            )))
            .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes))
            .layer(TraceLayer::new_for_http());

        let keep_alive = Arc::new(AtomicBool::new(true));
        let (drain_tx, drain_rx) = oneshot::channel();
        let task = tokio::spawn(serve_loop(
            listener,
            app,
            self.config.clone(),
            keep_alive.clone(),
            drain_rx,
        ));

        let server = ServeHandle::new(drain_tx, keep_alive, task);
        self.coordinator.run(server).await.map_err(ServerError::from)
    }
}

/// Accept loop: serves connections until a drain is requested, then stops
/// accepting and waits for in-flight requests to finish. The coordinator
/// bounds that wait with the drain timeout.
async fn serve_loop(
    listener: TcpListener,
    app: Router,
    config: ServerConfig,
    keep_alive: Arc<AtomicBool>,
    mut drain_rx: oneshot::Receiver<()>,
) {
    let graceful = GracefulShutdown::new();
    let service = TowerToHyperService::new(app);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(error) => {
                        tracing::warn!(error = %error, "Accept failed");
                        continue;
                    }
                };
                tracing::debug!(peer_addr = %peer_addr, "Connection accepted");

                let mut builder = auto::Builder::new(TokioExecutor::new());
                // For HTTP/1 the header read deadline also caps how long a
                // keep-alive connection may sit idle between requests.
                builder
                    .http1()
                    .timer(TokioTimer::new())
                    .max_buf_size(config.max_header_bytes)
                    .header_read_timeout(Duration::from_secs(config.read_timeout_secs))
                    .keep_alive(keep_alive.load(Ordering::Relaxed));
                builder
                    .http2()
                    .timer(TokioTimer::new())
                    .keep_alive_interval(Duration::from_secs(config.idle_timeout_secs))
                    .keep_alive_timeout(Duration::from_secs(config.read_timeout_secs));

                let connection = builder
                    .serve_connection_with_upgrades(TokioIo::new(stream), service.clone());
                let connection = graceful.watch(connection.into_owned());

                tokio::spawn(async move {
                    if let Err(error) = connection.await {
                        tracing::debug!(error = %error, "Connection closed with error");
                    }
                });
            }
            _ = &mut drain_rx => {
                break;
            }
        }
    }

    // Stop accepting, then wait for every watched connection: idle ones are
    // closed right away, active ones finish their current response.
    drop(listener);
    graceful.shutdown().await;
}
