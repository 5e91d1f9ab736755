//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Triggers (signals.rs, http::handlers):
//!     SIGINT/SIGQUIT/SIGTERM → try_send → shutdown channel
//!     POST /api/shutdown/{key} → try_send → shutdown channel
//!
//! Coordinator (shutdown.rs):
//!     wait on channel → disable keep-alives → stop accepting
//!     → drain in-flight requests → report outcome
//! ```
//!
//! # Design Decisions
//! - Capacity-1 channel with non-blocking sends: concurrent triggers collapse
//!   into one pending signal
//! - Signal streams are registered per coordinator, not as process globals
//! - Drain is bounded: after the timeout, remaining work is abandoned

pub mod shutdown;
pub mod signals;

pub use shutdown::{
    ServeHandle, ShutdownCoordinator, ShutdownError, ShutdownSignal, ShutdownTrigger,
    SHUTDOWN_TIMEOUT,
};
