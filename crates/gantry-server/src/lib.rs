//! Server runtime for the Gantry HTTP service scaffold.
//!
//! This crate owns the pieces of the scaffold with real failure semantics
//! and concurrency coordination:
//!
//! - [`Server`]: the lifecycle manager. Bind, serve, drain on SIGINT/SIGTERM
//!   with a bounded grace window, stop.
//! - [`Recovered`]: the panic recovery boundary installed around every
//!   attached handler; a handler fault degrades to one 500 response.
//! - [`Router`]: static route registration compiled onto a radix-tree
//!   matcher, answering 404/405 with canonical envelopes.
//! - [`ShutdownSignal`] / [`InFlight`]: the coordination primitives behind
//!   graceful shutdown.
//!
//! Handlers build their responses with the envelope and decoding types from
//! [`gantry_core`].
//!
//! # Quick start
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

pub mod config;
pub mod handler;
pub mod lifecycle;
pub mod logging;
pub mod recover;
pub mod router;
pub mod server;
pub mod shutdown;

pub use config::{Configuration, ConfigurationBuilder, Environment};
pub use handler::{
    empty_body, full_body, BodyError, HandlerFuture, HttpRequest, HttpResponse, RequestBody,
    RequestHandler,
};
pub use lifecycle::LifecycleState;
pub use recover::Recovered;
pub use router::{RoutedHandler, Router};
pub use server::{Server, ServerError, DEFAULT_GRACE_PERIOD};
pub use shutdown::{InFlight, InFlightGuard, ShutdownSignal};
