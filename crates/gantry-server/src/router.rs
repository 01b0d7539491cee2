//! Route registration glue.
//!
//! The [`Router`] is a static registration facility: routes are added up
//! front with [`Router::handle`] (or the method shorthands) and compiled
//! once by [`Router::into_handler`] into per-method [`matchit`] radix trees.
//! The compiled handler resolves each request, stores the extracted path
//! parameters in the request extensions (see
//! [`gantry_core::params::path_params`]), and answers unmatched requests
//! itself: unknown paths get the `not_found` envelope, known paths with the
//! wrong method get `method_not_allowed`.
//!
//! Paths are registered under a leading `/`, so handlers register
//! `"v1/movies/{id}"` and clients request `/v1/movies/42`.
//!
//! # Example
//!
//! ```rust
//! use gantry_core::Envelope;
//! use gantry_server::{HttpRequest, HttpResponse, Router};
//!
//! async fn health(_request: HttpRequest) -> HttpResponse {
//!     Envelope::ok("status", "available").into_response()
//! }
//!
//! let mut router = Router::new();
//! router.get("v1/healthcheck", health);
//! let handler = router.into_handler();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;

use gantry_core::params::Params;
use gantry_core::Envelope;

use crate::handler::{HandlerFuture, HttpRequest, RequestHandler};

/// A registered route, held until the table is compiled.
struct Route {
    method: Method,
    path: String,
    handler: Arc<dyn RequestHandler>,
}

/// Static route table.
///
/// Registration order is irrelevant; the table is compiled into radix trees
/// by [`Router::into_handler`].
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty route table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` requests to `path`.
    ///
    /// The path is prefixed with `/`; parameter segments use the `{name}`
    /// syntax (`"v1/movies/{id}"`).
    pub fn handle(&mut self, method: Method, path: &str, handler: impl RequestHandler) {
        self.routes.push(Route {
            method,
            path: Self::build_path(path),
            handler: Arc::new(handler),
        });
    }

    /// Registers a GET route.
    pub fn get(&mut self, path: &str, handler: impl RequestHandler) {
        self.handle(Method::GET, path, handler);
    }

    /// Registers a POST route.
    pub fn post(&mut self, path: &str, handler: impl RequestHandler) {
        self.handle(Method::POST, path, handler);
    }

    /// Registers a PUT route.
    pub fn put(&mut self, path: &str, handler: impl RequestHandler) {
        self.handle(Method::PUT, path, handler);
    }

    /// Registers a PATCH route.
    pub fn patch(&mut self, path: &str, handler: impl RequestHandler) {
        self.handle(Method::PATCH, path, handler);
    }

    /// Registers a DELETE route.
    pub fn delete(&mut self, path: &str, handler: impl RequestHandler) {
        self.handle(Method::DELETE, path, handler);
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Prefixes a registered path with `/`.
    fn build_path(path: &str) -> String {
        format!("/{}", path.trim_start_matches('/'))
    }

    /// Compiles the table into the request handler the server wraps.
    ///
    /// # Panics
    ///
    /// Panics if two routes for the same method conflict (identical or
    /// overlapping patterns), which is a registration-time programmer error.
    #[must_use]
    pub fn into_handler(self) -> RoutedHandler {
        let mut tables: HashMap<Method, matchit::Router<Arc<dyn RequestHandler>>> =
            HashMap::new();

        for route in self.routes {
            let table = tables.entry(route.method.clone()).or_default();
            if let Err(err) = table.insert(&route.path, route.handler) {
                panic!(
                    "conflicting route {} {}: {err}",
                    route.method, route.path
                );
            }
        }

        RoutedHandler { tables }
    }
}

/// The compiled route table, ready to serve requests.
pub struct RoutedHandler {
    tables: HashMap<Method, matchit::Router<Arc<dyn RequestHandler>>>,
}

impl RequestHandler for RoutedHandler {
    fn call(&self, mut request: HttpRequest) -> HandlerFuture {
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        if let Some(table) = self.tables.get(&method) {
            if let Ok(matched) = table.at(&path) {
                let mut params = Params::new();
                for (name, value) in matched.params.iter() {
                    params.insert(name, value);
                }
                request.extensions_mut().insert(params);
                return matched.value.clone().call(request);
            }
        }

        // The path may exist under another method.
        let path_is_known = self
            .tables
            .iter()
            .any(|(other, table)| *other != method && table.at(&path).is_ok());

        let envelope = if path_is_known {
            tracing::debug!(method = %method, path = %path, "method not allowed");
            Envelope::method_not_allowed(method.as_str())
        } else {
            tracing::debug!(method = %method, path = %path, "route not found");
            Envelope::not_found()
        };
        Box::pin(async move { envelope.into_response() })
    }
}
