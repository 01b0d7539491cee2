//! The canonical JSON response envelope.
//!
//! Every handler communicates its outcome to the client through an
//! [`Envelope`]: an HTTP status code, a three-way [`Outcome`] discriminator,
//! and exactly one application-defined payload key. The wire format is
//! two-space indented JSON with a trailing newline:
//!
//! ```text
//! {
//!   "message": "not found",
//!   "result": "fail",
//!   "status": "not found",
//!   "time": 1700000000
//! }
//! ```
//!
//! An envelope is consumed exactly once by [`Envelope::into_response`];
//! taking `self` by value makes reuse a compile error rather than a runtime
//! contract.
//!
//! # Example
//!
//! ```rust
//! use gantry_core::Envelope;
//!
//! let mut envelope = Envelope::ok("greeting", "hello");
//! envelope.header("X-Request-Id", "abc123");
//! let response = envelope.into_response();
//! assert_eq!(response.status(), 200);
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Response, StatusCode};
use http_body_util::Full;
use serde::Serialize;
use serde_json::{Map, Value};

/// The HTTP response type produced by consuming an [`Envelope`].
pub type HttpResponse = Response<Full<Bytes>>;

/// Generic message sent to clients when the server itself is at fault.
///
/// Deliberately vague: the real cause goes to the operator log only.
const INTERNAL_ERROR_MESSAGE: &str =
    "the server encontered a problem and could not process your request";

/// Three-way outcome discriminator carried by every envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request produced the expected result.
    Success,
    /// The client caused a 4xx condition.
    Fail,
    /// The server caused a 5xx condition.
    Error,
}

impl Outcome {
    /// Returns the wire representation of the outcome.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical structured response value.
///
/// Immutable once constructed apart from header accumulation; consumed by
/// [`Envelope::into_response`]. Constructed fresh per request, never shared.
#[derive(Debug, Clone)]
pub struct Envelope {
    code: StatusCode,
    reason: String,
    outcome: Outcome,
    time: u64,
    key: String,
    value: Value,
    headers: HeaderMap,
}

impl Envelope {
    /// Builds an envelope from a status code, outcome, and a single payload
    /// key/value pair. The creation time is captured here, in unix seconds.
    ///
    /// # Panics
    ///
    /// Construction failures are programmer errors and abort immediately:
    ///
    /// - `code` is not a recognized HTTP status code (no canonical reason
    ///   phrase; `0`, `900`, and unassigned in-range codes all count),
    /// - `key` is empty,
    /// - `value` is empty (JSON null or an empty string) or cannot be
    ///   represented as JSON.
    #[must_use]
    pub fn new(code: u16, outcome: Outcome, key: impl Into<String>, value: impl Serialize) -> Self {
        let status = match StatusCode::from_u16(code) {
            Ok(status) => status,
            Err(_) => panic!("response code {code} is unknown"),
        };
        let reason = match status.canonical_reason() {
            Some(reason) => reason.to_lowercase(),
            None => panic!("response code {code} is unknown"),
        };

        let key = key.into();
        assert!(!key.is_empty(), "response key cannot be empty");

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(err) => panic!("response data is not representable as JSON: {err}"),
        };
        assert!(!is_empty_value(&value), "response data cannot be empty");

        let time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();

        Self {
            code: status,
            reason,
            outcome,
            time,
            key,
            value,
            headers: HeaderMap::new(),
        }
    }

    /// Builds a `success` envelope.
    #[must_use]
    pub fn success(code: u16, key: impl Into<String>, value: impl Serialize) -> Self {
        Self::new(code, Outcome::Success, key, value)
    }

    /// 200 OK with the given payload.
    #[must_use]
    pub fn ok(key: impl Into<String>, value: impl Serialize) -> Self {
        Self::success(StatusCode::OK.as_u16(), key, value)
    }

    /// 201 Created with the given payload.
    #[must_use]
    pub fn created(key: impl Into<String>, value: impl Serialize) -> Self {
        Self::success(StatusCode::CREATED.as_u16(), key, value)
    }

    /// Builds a `fail` envelope for a client-caused 4xx condition.
    ///
    /// The payload key is always `error`.
    #[must_use]
    pub fn fail(code: u16, errors: impl Serialize) -> Self {
        Self::new(code, Outcome::Fail, "error", errors)
    }

    /// 400 Bad Request carrying the given error detail.
    #[must_use]
    pub fn bad_request(errors: impl Serialize) -> Self {
        Self::fail(StatusCode::BAD_REQUEST.as_u16(), errors)
    }

    /// 404 Not Found with the standard message.
    #[must_use]
    pub fn not_found() -> Self {
        Self::fail(
            StatusCode::NOT_FOUND.as_u16(),
            "the requested resource could not be found",
        )
    }

    /// 405 Method Not Allowed naming the rejected method.
    #[must_use]
    pub fn method_not_allowed(method: &str) -> Self {
        Self::fail(
            StatusCode::METHOD_NOT_ALLOWED.as_u16(),
            format!("the {method} method is not supported for this resource"),
        )
    }

    /// 409 Conflict with the standard edit-conflict message.
    #[must_use]
    pub fn conflict() -> Self {
        Self::fail(
            StatusCode::CONFLICT.as_u16(),
            "unable to update the record due to an edit conflict, please try again",
        )
    }

    /// 422 Unprocessable Entity carrying the given validation errors.
    #[must_use]
    pub fn unprocessable_entity(errors: impl Serialize) -> Self {
        Self::fail(StatusCode::UNPROCESSABLE_ENTITY.as_u16(), errors)
    }

    /// Builds an `error` envelope for a server-caused 5xx condition.
    ///
    /// The payload key is always `error`.
    #[must_use]
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self::new(code, Outcome::Error, "error", message.into())
    }

    /// 500 Internal Server Error with the generic client-facing message.
    #[must_use]
    pub fn internal_server_error() -> Self {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR.as_u16(), INTERNAL_ERROR_MESSAGE)
    }

    /// Returns the envelope's status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.code
    }

    /// Returns the envelope's outcome.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Sets a response header. The last write for a given name wins; safe to
    /// call any number of times before the envelope is consumed.
    ///
    /// # Panics
    ///
    /// Panics if `name` or `value` is not a valid HTTP header.
    pub fn header(&mut self, name: &str, value: &str) {
        let name = match HeaderName::try_from(name) {
            Ok(name) => name,
            Err(err) => panic!("invalid header name {name:?}: {err}"),
        };
        let value = match HeaderValue::try_from(value) {
            Ok(value) => value,
            Err(err) => panic!("invalid value for header {name}: {err}"),
        };
        self.headers.insert(name, value);
    }

    /// Consumes the envelope and produces the HTTP response: indented JSON
    /// body with a trailing newline, accumulated headers, then
    /// `Content-Type: application/json`, then the status line.
    ///
    /// If the payload cannot be serialized the envelope degrades to the
    /// generic 500 error response; if even that fails, to a bare 500 with no
    /// body. This path never faults.
    #[must_use]
    pub fn into_response(self) -> HttpResponse {
        match self.write() {
            Ok(response) => response,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response envelope");
                degraded_response()
            }
        }
    }

    /// Serializes the payload and assembles the response.
    fn write(&self) -> Result<HttpResponse, serde_json::Error> {
        let mut payload = Map::new();
        payload.insert("time".to_string(), Value::from(self.time));
        payload.insert("status".to_string(), Value::from(self.reason.clone()));
        payload.insert("result".to_string(), Value::from(self.outcome.as_str()));
        payload.insert(self.key.clone(), self.value.clone());

        // Two-space indent; the trailing newline makes terminal output readable.
        let mut body = serde_json::to_vec_pretty(&payload)?;
        body.push(b'\n');

        // Headers are applied only once the body is known good. Content-Type
        // is set last so it cannot be overridden by an accumulated header.
        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = self.code;
        response.headers_mut().extend(self.headers.clone());
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(response)
    }
}

/// Rejected payload values: JSON null and the empty string.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Fallback when an envelope cannot be serialized: the generic 500 error
/// envelope, or a bare 500 with no body if that fails too.
fn degraded_response() -> HttpResponse {
    match Envelope::internal_server_error().write() {
        Ok(response) => response,
        Err(_) => {
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_bytes(response: HttpResponse) -> Bytes {
        let body = response.into_body();
        http_body_util::BodyExt::collect(body)
            .await
            .expect("collecting a Full body cannot fail")
            .to_bytes()
    }

    async fn body_json(response: HttpResponse) -> Value {
        let body = body_bytes(response).await;
        serde_json::from_slice(&body).expect("body should be valid JSON")
    }

    #[tokio::test]
    async fn test_build_not_found_scenario() {
        let envelope = Envelope::new(404, Outcome::Fail, "message", "not found");
        assert_eq!(envelope.status(), StatusCode::NOT_FOUND);
        assert_eq!(envelope.outcome(), Outcome::Fail);

        let response = envelope.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json = body_json(response).await;
        assert_eq!(json["result"], "fail");
        assert_eq!(json["status"], "not found");
        assert_eq!(json["message"], "not found");
        assert!(json["time"].is_u64());
    }

    #[tokio::test]
    async fn test_recognized_codes_serialize_lowercased_reason() {
        for code in 100u16..=599 {
            let Ok(status) = StatusCode::from_u16(code) else {
                continue;
            };
            let Some(reason) = status.canonical_reason() else {
                continue;
            };

            let envelope = Envelope::new(code, Outcome::Success, "k", "v");
            let json = body_json(envelope.into_response()).await;
            assert_eq!(json["status"], reason.to_lowercase(), "code {code}");
        }
    }

    #[test]
    #[should_panic(expected = "response code 0 is unknown")]
    fn test_code_zero_is_rejected() {
        let _ = Envelope::new(0, Outcome::Success, "k", "v");
    }

    #[test]
    #[should_panic(expected = "response code 900 is unknown")]
    fn test_code_out_of_range_is_rejected() {
        let _ = Envelope::new(900, Outcome::Success, "k", "v");
    }

    #[test]
    #[should_panic(expected = "response code 299 is unknown")]
    fn test_unassigned_code_is_rejected() {
        let _ = Envelope::new(299, Outcome::Success, "k", "v");
    }

    #[test]
    #[should_panic(expected = "response key cannot be empty")]
    fn test_empty_key_is_rejected() {
        let _ = Envelope::new(200, Outcome::Success, "", "v");
    }

    #[test]
    #[should_panic(expected = "response data cannot be empty")]
    fn test_null_value_is_rejected() {
        let _ = Envelope::new(200, Outcome::Success, "k", Value::Null);
    }

    #[test]
    #[should_panic(expected = "response data cannot be empty")]
    fn test_empty_string_value_is_rejected() {
        let _ = Envelope::new(200, Outcome::Success, "k", "");
    }

    #[tokio::test]
    async fn test_body_is_indented_with_trailing_newline() {
        let response = Envelope::ok("message", "hi").into_response();
        let body = body_bytes(response).await;
        let text = std::str::from_utf8(&body).unwrap();

        assert!(text.starts_with("{\n  \""), "two-space indent: {text:?}");
        assert!(text.ends_with("}\n"), "trailing newline: {text:?}");
    }

    #[test]
    fn test_content_type_is_json() {
        let response = Envelope::ok("k", "v").into_response();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_header_last_write_wins() {
        let mut envelope = Envelope::ok("k", "v");
        envelope.header("X-Marker", "first");
        envelope.header("X-Marker", "second");

        let response = envelope.into_response();
        let values: Vec<_> = response.headers().get_all("X-Marker").iter().collect();
        assert_eq!(values, vec!["second"]);
    }

    #[test]
    fn test_content_type_cannot_be_overridden() {
        let mut envelope = Envelope::ok("k", "v");
        envelope.header("Content-Type", "text/plain");

        let response = envelope.into_response();
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[tokio::test]
    async fn test_fail_constructors_use_error_key() {
        let json = body_json(Envelope::bad_request("nope").into_response()).await;
        assert_eq!(json["result"], "fail");
        assert_eq!(json["error"], "nope");

        let json = body_json(Envelope::not_found().into_response()).await;
        assert_eq!(json["error"], "the requested resource could not be found");

        let json = body_json(Envelope::method_not_allowed("TRACE").into_response()).await;
        assert_eq!(
            json["error"],
            "the TRACE method is not supported for this resource"
        );

        let json = body_json(Envelope::conflict().into_response()).await;
        assert_eq!(
            json["error"],
            "unable to update the record due to an edit conflict, please try again"
        );
    }

    #[tokio::test]
    async fn test_internal_server_error_shape() {
        let envelope = Envelope::internal_server_error();
        assert_eq!(envelope.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(envelope.outcome(), Outcome::Error);

        let json = body_json(envelope.into_response()).await;
        assert_eq!(json["result"], "error");
        assert_eq!(json["status"], "internal server error");
        assert_eq!(json["error"], INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_structured_payload_value() {
        #[derive(serde::Serialize)]
        struct Movie {
            title: &'static str,
            year: u16,
        }

        let response = Envelope::created("movie", Movie { title: "Arrival", year: 2016 })
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let json = body_json(response).await;
        assert_eq!(json["movie"]["title"], "Arrival");
        assert_eq!(json["movie"]["year"], 2016);
    }
}
