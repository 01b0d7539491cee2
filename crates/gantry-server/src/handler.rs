//! The request handler contract.
//!
//! A [`RequestHandler`] takes a request and produces the HTTP response,
//! normally by building an [`Envelope`](gantry_core::Envelope) and consuming
//! it. Handlers are installed on the server once, wrapped by the recovery
//! boundary, and invoked once per request.
//!
//! Request bodies are type-erased ([`RequestBody`]) so handlers can be
//! driven directly in tests with [`full_body`]/[`empty_body`], without a
//! live socket behind them.
//!
//! # Example
//!
//! ```rust
//! use gantry_core::Envelope;
//! use gantry_server::{HttpRequest, HttpResponse};
//!
//! async fn hello(_request: HttpRequest) -> HttpResponse {
//!     Envelope::ok("message", "hello").into_response()
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::Request;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};

pub use gantry_core::envelope::HttpResponse;

/// Type-erased body error.
pub type BodyError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased request body handed to handlers.
pub type RequestBody = UnsyncBoxBody<Bytes, BodyError>;

/// The request type handlers receive.
pub type HttpRequest = Request<RequestBody>;

/// Boxed future returned by [`RequestHandler::call`].
pub type HandlerFuture = Pin<Box<dyn Future<Output = HttpResponse> + Send>>;

/// A request handler: one invocation per request, response out.
///
/// Implemented for any `async fn(HttpRequest) -> HttpResponse` and for the
/// router's compiled handler; custom implementations are free to hold state
/// behind `&self`.
pub trait RequestHandler: Send + Sync + 'static {
    /// Handles one request.
    fn call(&self, request: HttpRequest) -> HandlerFuture;
}

impl<F, Fut> RequestHandler for F
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HttpResponse> + Send + 'static,
{
    fn call(&self, request: HttpRequest) -> HandlerFuture {
        Box::pin(self(request))
    }
}

/// Builds a [`RequestBody`] from buffered bytes.
#[must_use]
pub fn full_body(bytes: impl Into<Bytes>) -> RequestBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Builds an empty [`RequestBody`].
#[must_use]
pub fn empty_body() -> RequestBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}
