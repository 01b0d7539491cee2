//! Shutdown signaling and in-flight request tracking.
//!
//! Two small coordination pieces back the server's graceful shutdown:
//!
//! - [`ShutdownSignal`]: a cloneable, idempotent flag that tasks can await.
//!   [`ShutdownSignal::with_os_signals`] arms it from SIGINT/SIGTERM.
//! - [`InFlight`]: an RAII counter of live connections; the drain path
//!   awaits [`InFlight::drained`] under the grace window.
//!
//! # Example
//!
//! ```rust
//! use gantry_server::ShutdownSignal;
//!
//! let shutdown = ShutdownSignal::new();
//! let observer = shutdown.clone();
//!
//! shutdown.trigger();
//! assert!(observer.is_triggered());
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

/// A cloneable termination signal.
///
/// All clones observe the same flag; triggering is idempotent.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    /// Creates an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signal armed by the process termination signals.
    ///
    /// A background task waits for SIGINT or SIGTERM (Ctrl+C on non-Unix
    /// platforms), logs which one arrived, and trips the signal.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let armed = signal.clone();

        tokio::spawn(async move {
            let name = wait_for_os_signal().await;
            tracing::info!(signal = name, "termination signal received");
            armed.trigger();
        });

        signal
    }

    /// Trips the signal, waking every waiter. Idempotent.
    pub fn trigger(&self) {
        if self
            .triggered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.notify.notify_waiters();
        }
    }

    /// Returns `true` once the signal has been tripped.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Completes when the signal is tripped; immediately if it already was.
    pub async fn signalled(&self) {
        loop {
            if self.is_triggered() {
                return;
            }
            // Register before re-checking so a trigger between the check and
            // the await cannot be missed.
            let notified = self.notify.notified();
            if self.is_triggered() {
                return;
            }
            notified.await;
        }
    }
}

/// Waits for a process termination signal and names which one arrived.
async fn wait_for_os_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(err) => panic!("failed to register SIGTERM handler: {err}"),
        };
        let mut interrupt = match signal(SignalKind::interrupt()) {
            Ok(stream) => stream,
            Err(err) => panic!("failed to register SIGINT handler: {err}"),
        };

        tokio::select! {
            _ = terminate.recv() => "terminate",
            _ = interrupt.recv() => "interrupt",
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            panic!("failed to wait for Ctrl+C: {err}");
        }
        "interrupt"
    }
}

/// Counter of live connections, used to bound the drain wait.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl InFlight {
    /// Creates a tracker with no live connections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection; the returned guard deregisters it on drop.
    #[must_use]
    pub fn track(&self) -> InFlightGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            active: Arc::clone(&self.active),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Completes once every tracked connection has finished; immediately if
    /// none are live.
    pub async fn drained(&self) {
        loop {
            if self.active() == 0 {
                return;
            }
            let notified = self.notify.notified();
            if self.active() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// RAII registration of one live connection.
#[derive(Debug)]
pub struct InFlightGuard {
    active: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let previous = self.active.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 {
            self.notify.notify_waiters();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_signal_starts_untriggered() {
        assert!(!ShutdownSignal::new().is_triggered());
    }

    #[test]
    fn test_trigger_is_idempotent() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        assert!(signal.is_triggered());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let signal = ShutdownSignal::new();
        let observer = signal.clone();
        signal.trigger();
        assert!(observer.is_triggered());
    }

    #[tokio::test]
    async fn test_signalled_completes_on_trigger() {
        let signal = ShutdownSignal::new();
        let waiter = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            signal.trigger();
        });

        tokio::time::timeout(Duration::from_secs(1), waiter.signalled())
            .await
            .expect("signalled should complete after trigger");
    }

    #[tokio::test]
    async fn test_signalled_completes_immediately_when_already_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        tokio::time::timeout(Duration::from_millis(10), signal.signalled())
            .await
            .expect("signalled should complete immediately");
    }

    #[test]
    fn test_in_flight_counts_guards() {
        let in_flight = InFlight::new();
        assert_eq!(in_flight.active(), 0);

        let first = in_flight.track();
        let second = in_flight.track();
        assert_eq!(in_flight.active(), 2);

        drop(first);
        assert_eq!(in_flight.active(), 1);
        drop(second);
        assert_eq!(in_flight.active(), 0);
    }

    #[tokio::test]
    async fn test_drained_completes_immediately_when_idle() {
        let in_flight = InFlight::new();
        tokio::time::timeout(Duration::from_millis(10), in_flight.drained())
            .await
            .expect("drained should complete with no connections");
    }

    #[tokio::test]
    async fn test_drained_waits_for_last_guard() {
        let in_flight = InFlight::new();
        let guard = in_flight.track();

        let waiter = in_flight.clone();
        let drained = tokio::spawn(async move { waiter.drained().await });

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            drop(guard);
        });

        tokio::time::timeout(Duration::from_secs(1), drained)
            .await
            .expect("drained should complete")
            .expect("drain task should not panic");
    }
}
