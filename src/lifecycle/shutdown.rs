//! Shutdown coordination for the server.
//!
//! # Responsibilities
//! - Own the capacity-1 shutdown channel both trigger paths converge on
//! - Block until the first trigger lands (OS signal or HTTP endpoint)
//! - Drive the drain sequence against the serve loop, bounded by a timeout
//!
//! # Design Decisions
//! - Sends never block: `try_send` on a full channel is a logged no-op, so
//!   concurrent triggers collapse into a single pending signal
//! - The drain window is fixed, not configurable
//! - A drain that overruns the window is reported, never retried

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::signals;

/// Upper bound on the drain once a shutdown trigger has been received.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// A shutdown trigger, tagged with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT, or the synthetic interrupt queued by the shutdown endpoint.
    Interrupt,
    /// SIGQUIT.
    Quit,
    /// SIGTERM.
    Terminate,
}

impl std::fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "interrupt"),
            ShutdownSignal::Quit => write!(f, "quit"),
            ShutdownSignal::Terminate => write!(f, "terminate"),
        }
    }
}

/// Error type for the drain sequence.
///
/// Every variant names the shutdown so callers can tell "shutdown was
/// requested" apart from the underlying cause.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// In-flight requests outlived the drain window.
    #[error("server shutdown: drain timed out after {0:?}")]
    DrainTimeout(Duration),

    /// The base cancellation token fired before the drain finished.
    #[error("server shutdown: canceled while draining")]
    Canceled,

    /// The serve task ended abnormally.
    #[error("server shutdown: serve task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Sending half of the shutdown channel.
///
/// Cloneable and safe to call from any request-handling task.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: mpsc::Sender<ShutdownSignal>,
}

impl ShutdownTrigger {
    /// Request a shutdown.
    ///
    /// Never blocks and never errors: the channel holds one pending signal,
    /// and if one is already queued this request is dropped.
    pub fn trigger(&self) {
        self.send(ShutdownSignal::Interrupt);
    }

    pub(crate) fn send(&self, signal: ShutdownSignal) {
        match self.tx.try_send(signal) {
            Ok(()) => tracing::info!(signal = %signal, "Shutdown signal sent"),
            Err(TrySendError::Full(_)) => tracing::info!("Shutdown signal already sent"),
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("Shutdown channel closed, signal dropped")
            }
        }
    }

    /// Resolves once the coordinator owning the receiving half is gone.
    pub(crate) async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Handle to a running serve loop.
///
/// Carries the capabilities the drain sequence operates through: flip
/// keep-alives off, ask the loop to stop accepting and drain, and wait for it
/// to finish. Produced by starting the serve loop; consumed by the
/// coordinator.
pub struct ServeHandle {
    drain_tx: Option<oneshot::Sender<()>>,
    keep_alive: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl ServeHandle {
    pub(crate) fn new(
        drain_tx: oneshot::Sender<()>,
        keep_alive: Arc<AtomicBool>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            drain_tx: Some(drain_tx),
            keep_alive,
            task,
        }
    }

    /// Stop handing out keep-alive to connections accepted from now on.
    ///
    /// Connections already open are closed by the drain itself.
    pub fn disable_keep_alives(&self) {
        self.keep_alive.store(false, Ordering::Relaxed);
    }

    /// Ask the serve loop to stop accepting and drain. Idempotent.
    pub fn request_drain(&mut self) {
        if let Some(tx) = self.drain_tx.take() {
            // The loop may already be gone; nothing left to signal then.
            let _ = tx.send(());
        }
    }
}

/// Coordinator for graceful shutdown.
///
/// Owns the receiving half of the shutdown channel. OS signal streams are
/// registered when the coordinator is built and forwarded into the channel
/// until it is dropped; each coordinator instance has its own streams.
pub struct ShutdownCoordinator {
    tx: mpsc::Sender<ShutdownSignal>,
    rx: mpsc::Receiver<ShutdownSignal>,
    base: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator subscribed to SIGINT, SIGQUIT and SIGTERM.
    ///
    /// Must be called from within a tokio runtime. Fails if a signal stream
    /// cannot be installed.
    pub fn new() -> std::io::Result<Self> {
        Self::with_context(CancellationToken::new())
    }

    /// Like [`ShutdownCoordinator::new`], with `base` additionally bounding
    /// the drain. The default base token is never cancelled.
    pub fn with_context(base: CancellationToken) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel(1);
        signals::forward(ShutdownTrigger { tx: tx.clone() })?;
        Ok(Self { tx, rx, base })
    }

    /// A sender for this coordinator's channel.
    pub fn trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger {
            tx: self.tx.clone(),
        }
    }

    /// Block until the first trigger of either kind lands.
    pub async fn wait(&mut self) -> ShutdownSignal {
        // A sender half lives in `self`, so the channel cannot close while
        // the coordinator is alive.
        self.rx.recv().await.unwrap_or(ShutdownSignal::Interrupt)
    }

    /// Block until a shutdown is triggered, then drain `server`.
    ///
    /// The drain disables keep-alives, stops the accept loop and waits for
    /// in-flight requests, bounded by [`SHUTDOWN_TIMEOUT`] and the base
    /// token. Returns an error if the drain does not finish in time; a second
    /// trigger while draining is a no-op.
    pub async fn run(mut self, server: ServeHandle) -> Result<(), ShutdownError> {
        let signal = self.wait().await;
        tracing::info!(signal = %signal, "Shutdown signal received");
        self.drain(server, SHUTDOWN_TIMEOUT).await
    }

    async fn drain(&self, mut server: ServeHandle, timeout: Duration) -> Result<(), ShutdownError> {
        let begun = Instant::now();
        tracing::info!(timeout = ?timeout, "Bounding drain window");

        tracing::info!(elapsed = ?begun.elapsed(), "Canceling idle connections");
        server.disable_keep_alives();

        tracing::info!(elapsed = ?begun.elapsed(), "Draining in-flight requests");
        server.request_drain();

        let outcome = tokio::select! {
            joined = &mut server.task => joined.map_err(ShutdownError::from),
            _ = tokio::time::sleep(timeout) => Err(ShutdownError::DrainTimeout(timeout)),
            _ = self.base.cancelled() => Err(ShutdownError::Canceled),
        };

        match &outcome {
            Ok(()) => {
                tracing::info!(elapsed = ?begun.elapsed(), "Server stopped gracefully");
            }
            Err(error) => {
                // Remaining in-flight work is abandoned once the window closes.
                server.task.abort();
                tracing::error!(elapsed = ?begun.elapsed(), error = %error, "Drain did not complete");
            }
        }
        outcome
    }
}
