//! The server lifecycle manager.
//!
//! [`Server`] owns the listening socket and coordinates the whole lifecycle:
//! bind, serve, drain on a termination signal, stop. Each inbound connection
//! is served on its own task through the attached handler, which is always
//! wrapped by the recovery boundary, so a handler fault degrades to one 500
//! response, never a crashed process.
//!
//! Shutdown is coordinated by a single background watcher task: it waits for
//! the termination signal, transitions the server to draining, waits (under
//! the grace window) for in-flight connections to finish, and reports the
//! outcome over a oneshot completion channel that `run` blocks on. The
//! channel is written exactly once, by the watcher alone.
//!
//! # Example
//!
//! ```rust,no_run
//! use gantry_core::Envelope;
//! use gantry_server::{Configuration, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gantry_server::ServerError> {
//!     let mut router = Router::new();
//!     router.get("v1/healthcheck", |_request| async {
//!         Envelope::ok("status", "available").into_response()
//!     });
//!
//!     let mut server = Server::new(Configuration::default());
//!     server.handler(router.into_handler());
//!     server.run().await
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper::Request;
use http_body_util::BodyExt;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use crate::config::{Configuration, Environment};
use crate::handler::{BodyError, HttpRequest, RequestHandler};
use crate::lifecycle::{LifecycleState, StateCell};
use crate::logging;
use crate::recover::Recovered;
use crate::shutdown::{InFlight, ShutdownSignal};

/// Default bounded grace window for draining in-flight requests.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Errors returned by [`Server::run`]. All are fatal to the process; none
/// are retried internally.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `run` was called before a handler was attached.
    #[error("server handler has not been set")]
    MissingHandler,

    /// The listener could not bind the configured address.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The listener failed while accepting connections.
    #[error("listener failed while accepting connections: {0}")]
    Accept(#[source] std::io::Error),

    /// In-flight requests did not finish within the grace window; they were
    /// abandoned and the server stopped forcibly.
    #[error("graceful shutdown did not finish within {grace:?}")]
    ShutdownTimeout {
        /// The grace window that elapsed.
        grace: Duration,
    },

    /// The shutdown watcher exited without reporting a drain outcome.
    #[error("shutdown watcher exited without reporting an outcome")]
    WatcherLost,
}

/// The HTTP server and its lifecycle manager.
///
/// Construct with an explicit [`Configuration`], attach a handler, then
/// [`run`](Server::run). See the module docs for the shutdown protocol.
pub struct Server {
    config: Configuration,
    handler: Option<Arc<dyn RequestHandler>>,
    grace_period: Duration,
    state: StateCell,
}

impl Server {
    /// Creates a server from an explicit configuration. No handler is
    /// attached yet; [`run`](Server::run) refuses to start without one.
    #[must_use]
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            handler: None,
            grace_period: DEFAULT_GRACE_PERIOD,
            state: StateCell::new(),
        }
    }

    /// Attaches the request handler, wrapped by the recovery boundary.
    ///
    /// Must be called before [`run`](Server::run). Calling it again replaces
    /// the previous handler.
    pub fn handler(&mut self, handler: impl RequestHandler) {
        self.handler = Some(Arc::new(Recovered::new(handler)));
    }

    /// Overrides the grace window used when draining in-flight requests.
    ///
    /// Defaults to [`DEFAULT_GRACE_PERIOD`].
    pub fn grace_period(&mut self, grace: Duration) {
        self.grace_period = grace;
    }

    /// Returns the server's current lifecycle state.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.state.get()
    }

    /// Returns the server's configuration.
    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Binds the configured address and serves until a termination signal
    /// (SIGINT or SIGTERM) completes the shutdown protocol.
    ///
    /// Blocks the calling task until the socket is closed and the drain
    /// outcome is known.
    ///
    /// # Errors
    ///
    /// - [`ServerError::MissingHandler`] if no handler was attached; the
    ///   socket is never bound in that case.
    /// - [`ServerError::Bind`] if the address cannot be bound.
    /// - [`ServerError::Accept`] if the listener fails for any reason other
    ///   than the deliberate close; no shutdown coordination is attempted.
    /// - [`ServerError::ShutdownTimeout`] if in-flight requests outlive the
    ///   grace window.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Like [`run`](Server::run), but driven by the given signal instead of
    /// the process signals. The seam tests and embedders use.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        // Refuse before binding: a misconfigured server must not take the port.
        if self.handler.is_none() {
            return Err(ServerError::MissingHandler);
        }

        let addr = self.config.address();
        let listener = match TcpListener::bind(&addr).await {
            Ok(listener) => listener,
            Err(source) => {
                self.state.set(LifecycleState::Failed);
                return Err(ServerError::Bind { addr, source });
            }
        };

        self.serve(listener, shutdown).await
    }

    /// Serves on an already-bound listener until `shutdown` completes the
    /// shutdown protocol. Useful when the caller needs the bound address
    /// (for example `127.0.0.1:0` in tests).
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let Some(handler) = self.handler.clone() else {
            return Err(ServerError::MissingHandler);
        };

        logging::init_default();

        self.state.set(LifecycleState::Running);
        tracing::info!(
            addr = %self.config.address(),
            scheme = self.config.scheme(),
            environment = %self.config.environment(),
            "starting server"
        );

        let in_flight = InFlight::new();
        let (done_tx, done_rx) = oneshot::channel::<Result<(), ServerError>>();

        // The watcher observes the termination signal, drives the bounded
        // drain, and writes the outcome exactly once.
        {
            let shutdown = shutdown.clone();
            let state = self.state.clone();
            let in_flight = in_flight.clone();
            let grace = self.grace_period;
            let environment = self.config.environment();

            tokio::spawn(async move {
                shutdown.signalled().await;

                // Keep the ^C echo off the next log line in a terminal.
                if environment == Environment::Development {
                    println!("\n");
                }

                tracing::info!("shutting down server");
                state.set(LifecycleState::Draining);

                let outcome = match tokio::time::timeout(grace, in_flight.drained()).await {
                    Ok(()) => Ok(()),
                    Err(_) => Err(ServerError::ShutdownTimeout { grace }),
                };
                let _ = done_tx.send(outcome);
            });
        }

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let guard = in_flight.track();
                        let handler = Arc::clone(&handler);
                        let shutdown = shutdown.clone();
                        let read_timeout = self.config.read_timeout();

                        tokio::spawn(async move {
                            serve_connection(stream, peer, handler, shutdown, read_timeout).await;
                            drop(guard);
                        });
                    }
                    Err(source) => {
                        self.state.set(LifecycleState::Failed);
                        return Err(ServerError::Accept(source));
                    }
                },

                () = shutdown.signalled() => break,
            }
        }

        // Closing the listener refuses new connections while the watcher
        // waits out the drain.
        drop(listener);

        match done_rx.await {
            Ok(Ok(())) => {
                self.state.set(LifecycleState::Stopped);
                tracing::info!(addr = %self.config.address(), "server stopped");
                Ok(())
            }
            Ok(Err(err)) => {
                self.state.set(LifecycleState::Failed);
                tracing::error!(
                    active = in_flight.active(),
                    error = %err,
                    "forced server stop"
                );
                Err(err)
            }
            Err(_) => {
                self.state.set(LifecycleState::Failed);
                Err(ServerError::WatcherLost)
            }
        }
    }
}

/// Serves one connection, honoring the drain protocol: when the shutdown
/// signal fires, keep-alive stops and the in-flight request is allowed to
/// finish.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<dyn RequestHandler>,
    shutdown: ShutdownSignal,
    read_timeout: Duration,
) {
    let io = TokioIo::new(stream);

    let service = service_fn(move |request: Request<Incoming>| {
        let handler = Arc::clone(&handler);
        async move {
            let request: HttpRequest =
                request.map(|body| body.map_err(BodyError::from).boxed_unsync());
            Ok::<_, Infallible>(handler.call(request).await)
        }
    });

    let mut builder = http1::Builder::new();
    builder.timer(TokioTimer::new());
    builder.header_read_timeout(read_timeout);

    let connection = builder.serve_connection(io, service);
    tokio::pin!(connection);

    let mut draining = false;
    loop {
        tokio::select! {
            served = connection.as_mut() => {
                if let Err(err) = served {
                    tracing::debug!(peer = %peer, error = %err, "connection closed with error");
                }
                break;
            }
            () = shutdown.signalled(), if !draining => {
                draining = true;
                connection.as_mut().graceful_shutdown();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_core::Envelope;
    use crate::handler::HttpResponse;

    async fn ok_handler(_request: HttpRequest) -> HttpResponse {
        Envelope::ok("message", "hi").into_response()
    }

    #[tokio::test]
    async fn test_run_without_handler_fails_fast() {
        let server = Server::new(Configuration::default());
        let err = server
            .run_with_shutdown(ShutdownSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::MissingHandler));
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let config = Configuration::builder()
            .host("203.0.113.1") // TEST-NET-3, not routable locally
            .port(4)
            .build();

        let mut server = Server::new(config);
        server.handler(ok_handler);

        let err = server
            .run_with_shutdown(ShutdownSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_pre_triggered_shutdown_stops_cleanly() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

        let mut server = Server::new(Configuration::default());
        server.handler(ok_handler);

        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            server.serve(listener, shutdown),
        )
        .await
        .expect("serve should exit promptly");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_state_starts_idle() {
        let server = Server::new(Configuration::default());
        assert_eq!(server.state(), LifecycleState::Idle);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ServerError::MissingHandler.to_string(),
            "server handler has not been set"
        );
        let err = ServerError::ShutdownTimeout {
            grace: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }
}
