//! Operator-facing logging.
//!
//! All runtime logging goes through the [`tracing`] facade; the operator
//! injects whatever subscriber the deployment wants before calling
//! [`Server::run`](crate::Server::run). When nothing has been installed,
//! [`init_default`] lazily attaches a plain-text stdout subscriber so the
//! server never runs silent.

use tracing_subscriber::EnvFilter;

/// Installs the default stdout text subscriber if no global subscriber has
/// been set. Safe to call more than once; later calls are no-ops.
///
/// The filter honors `RUST_LOG` and defaults to `info`.
pub fn init_default() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // try_init fails when a subscriber is already installed, which is
    // exactly the case where the operator's choice should win.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
