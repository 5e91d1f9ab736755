//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → ServerConfig (defaults applied, immutable)
//!     → consumed by http::Server at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - The listen address is derived from host and port on demand, never stored

pub mod loader;
pub mod schema;

pub use loader::{load_config, ConfigError};
pub use schema::ServerConfig;
