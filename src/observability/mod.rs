//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via tracing; the registry is initialized once per
//!   process by the binaries
//! - Log level configurable via RUST_LOG with a crate-scoped default
//! - Drain progress is logged step by step; logging is diagnostic only and
//!   not part of any contract

pub mod logging;
