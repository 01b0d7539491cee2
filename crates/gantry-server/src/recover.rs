//! The panic recovery boundary.
//!
//! [`Recovered`] is the single fault-catching layer of the server: it wraps
//! the attached handler and converts any panic, whether raised while
//! building the handler future or while awaiting it, into a well-formed
//! 500 `error` envelope. The panic detail goes to the operator log only;
//! the client sees the generic message. The poisoned connection is marked
//! `Connection: close` so the HTTP layer does not reuse it.
//!
//! The boundary is installed exactly once, by
//! [`Server::handler`](crate::Server::handler); nothing else in the tree
//! catches unwinds.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::header::{HeaderValue, CONNECTION};

use gantry_core::Envelope;

use crate::handler::{HandlerFuture, HttpRequest, HttpResponse, RequestHandler};

/// Wraps a handler with the panic recovery boundary.
#[derive(Debug)]
pub struct Recovered<H> {
    inner: H,
}

impl<H> Recovered<H> {
    /// Wraps `inner` in the recovery boundary.
    #[must_use]
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H: RequestHandler> RequestHandler for Recovered<H> {
    fn call(&self, request: HttpRequest) -> HandlerFuture {
        // A handler can panic before it returns its future.
        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| self.inner.call(request)))
        {
            Ok(future) => future,
            Err(panic) => return Box::pin(async move { recovered_response(&panic) }),
        };

        Box::pin(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(response) => response,
                Err(panic) => recovered_response(&panic),
            }
        })
    }
}

/// Logs the fault and synthesizes the fixed 500 envelope.
///
/// Everything after the catch is infallible: the envelope's degraded path
/// bottoms out in a bare 500 with no body.
fn recovered_response(panic: &(dyn Any + Send)) -> HttpResponse {
    tracing::error!(error = %panic_detail(panic), "recovered panicking request handler");
    tracing::info!(code = 500, "response");

    let mut response = Envelope::internal_server_error().into_response();
    response
        .headers_mut()
        .insert(CONNECTION, HeaderValue::from_static("close"));
    response
}

/// Extracts a printable message from a panic payload.
fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::empty_body;
    use http::{Request, StatusCode};
    use http_body_util::BodyExt;

    fn request() -> HttpRequest {
        Request::builder().uri("/").body(empty_body()).unwrap()
    }

    async fn body_json(response: HttpResponse) -> serde_json::Value {
        let body = BodyExt::collect(response.into_body())
            .await
            .unwrap()
            .to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_normal_handler_passes_through() {
        async fn handler(_request: HttpRequest) -> HttpResponse {
            Envelope::ok("message", "fine").into_response()
        }

        let recovered = Recovered::new(handler);
        let response = recovered.call(request()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(CONNECTION).is_none());
    }

    #[tokio::test]
    async fn test_panicking_future_becomes_error_envelope() {
        async fn handler(_request: HttpRequest) -> HttpResponse {
            panic!("handler exploded");
        }

        let recovered = Recovered::new(handler);
        let response = recovered.call(request()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers().get(CONNECTION).unwrap(), "close");

        let json = body_json(response).await;
        assert_eq!(json["result"], "error");
        assert_eq!(
            json["error"],
            "the server encontered a problem and could not process your request"
        );
    }

    #[tokio::test]
    async fn test_panic_before_the_future_is_caught() {
        struct Exploding;

        impl RequestHandler for Exploding {
            fn call(&self, _request: HttpRequest) -> HandlerFuture {
                panic!("no future for you");
            }
        }

        let recovered = Recovered::new(Exploding);
        let response = recovered.call(request()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_string_panic_payloads_are_handled() {
        async fn handler(_request: HttpRequest) -> HttpResponse {
            let reason = format!("bad index {}", 7);
            panic!("{reason}");
        }

        let recovered = Recovered::new(handler);
        let response = recovered.call(request()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_panic_detail_extraction() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_detail(payload.as_ref()), "static message");

        let payload: Box<dyn Any + Send> = Box::new("owned".to_string());
        assert_eq!(panic_detail(payload.as_ref()), "owned");

        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_detail(payload.as_ref()), "non-string panic payload");
    }
}
