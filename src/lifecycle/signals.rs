//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal streams (SIGINT, SIGQUIT, SIGTERM) at coordinator
//!   construction
//! - Translate deliveries into shutdown signals on the coordinator's channel
//!
//! # Design Decisions
//! - Streams are owned by a forwarder task, one per coordinator, so multiple
//!   coordinators in a process do not race on a shared subscription
//! - Forwarding uses the channel's non-blocking send; repeat deliveries while
//!   a signal is pending are dropped
//! - The forwarder exits when the coordinator (the receiving half) is gone

use crate::lifecycle::shutdown::{ShutdownSignal, ShutdownTrigger};

/// Install signal streams and spawn the forwarder for `trigger`'s channel.
///
/// Fails if the OS refuses a handler registration.
#[cfg(unix)]
pub(crate) fn forward(trigger: ShutdownTrigger) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut quit = signal(SignalKind::quit())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = interrupt.recv() => ShutdownSignal::Interrupt,
                Some(()) = quit.recv() => ShutdownSignal::Quit,
                Some(()) = terminate.recv() => ShutdownSignal::Terminate,
                () = trigger.closed() => break,
            };
            trigger.send(received);
        }
    });

    Ok(())
}

/// Fallback for targets without the unix signal set: Ctrl+C stands in for
/// the whole set.
#[cfg(not(unix))]
pub(crate) fn forward(trigger: ShutdownTrigger) -> std::io::Result<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = tokio::signal::ctrl_c() => {
                    if received.is_err() {
                        break;
                    }
                    trigger.send(ShutdownSignal::Interrupt);
                }
                () = trigger.closed() => break,
            }
        }
    });

    Ok(())
}
