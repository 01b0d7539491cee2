//! # Gantry
//!
//! An HTTP service scaffold: the runtime core every service starts from.
//!
//! Gantry owns the server's lifecycle (start, accept traffic, drain on a
//! termination signal within a bounded grace window, stop) and the
//! structured response protocol every handler speaks: a canonical JSON
//! envelope with a `success | fail | error` outcome, plus a strict,
//! size-capped request decoder whose failures classify into messages safe
//! to show clients. A single panic-recovery boundary around the attached
//! handler guarantees that any handler fault degrades to one 500 response
//! instead of a crashed process.
//!
//! # Example
//!
//! ```rust,no_run
//! use gantry::{Configuration, Envelope, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), gantry::ServerError> {
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

pub use gantry_core::{
    decode, envelope, params, DecodeError, Envelope, HttpResponse, Outcome, Param, ParamError,
    Params, MAX_BODY_BYTES,
};
pub use gantry_server::{
    config, handler, lifecycle, logging, recover, router, server, shutdown, BodyError,
    Configuration, ConfigurationBuilder, Environment, HandlerFuture, HttpRequest, InFlight,
    InFlightGuard, LifecycleState, Recovered, RequestBody, RequestHandler, RoutedHandler, Router,
    Server, ServerError, ShutdownSignal, DEFAULT_GRACE_PERIOD,
};
