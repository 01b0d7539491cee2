//! Core types for the Gantry HTTP service scaffold.
//!
//! This crate owns the two protocol pieces every Gantry handler touches:
//!
//! - [`Envelope`]: the canonical JSON response value (status metadata plus a
//!   single application payload key) and its serialization contract.
//! - [`DecodeError`] and the [`decode`] functions: strict, size-capped JSON
//!   request-body decoding with a classified error taxonomy handlers can turn
//!   into `fail` envelopes.
//!
//! It also carries the [`params`] helpers for typed access to path and query
//! string parameters extracted by the router.
//!
//! The server runtime (lifecycle, recovery boundary, routing glue) lives in
//! `gantry-server`; this crate stays free of socket and runtime concerns so
//! handlers and their tests can use it directly.

pub mod decode;
pub mod envelope;
pub mod params;

pub use decode::{from_body, from_slice, DecodeError, MAX_BODY_BYTES};
pub use envelope::{Envelope, HttpResponse, Outcome};
pub use params::{path_params, query_params, Param, ParamError, Params};
