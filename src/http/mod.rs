//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, protocol limits, graceful drain)
//!     → Router (application routes merged with the API router)
//!     → handlers.rs (health, authenticated shutdown)
//! ```

pub mod handlers;
pub mod server;

pub use handlers::AppState;
pub use server::{Server, ServerError};
