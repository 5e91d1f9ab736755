//! Graceful shutdown wrapper around an axum/hyper HTTP server.
//!
//! Wires OS termination signals and an authenticated shutdown endpoint into
//! one capacity-1 channel, serves until the first trigger lands, then stops
//! accepting connections and drains in-flight requests within a fixed window.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use http::{Server, ServerError};
pub use lifecycle::{ShutdownCoordinator, ShutdownError, ShutdownTrigger, SHUTDOWN_TIMEOUT};

/// Crate version from build metadata.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
