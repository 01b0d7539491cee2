//! Typed access to path and query string parameters.
//!
//! The router stores the path parameters it extracts in the request's
//! extensions as a [`Params`] map. Handlers pull the ones they care about
//! with [`path_params`] or [`query_params`] and convert them with the
//! checked accessors on [`Param`]:
//!
//! ```rust
//! use gantry_core::params::Param;
//!
//! let id = Param::new("42");
//! assert_eq!(id.as_i64(), Ok(42));
//!
//! let missing = Param::new("");
//! assert!(missing.as_i64().is_err());
//! ```
//!
//! Parameter values are raw strings off the wire; conversion failures are
//! classified so handlers can surface them in a `fail` envelope.

use std::collections::HashMap;

use http::Request;
use thiserror::Error;

/// Classified reason a parameter conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamError {
    /// The parameter was absent or had no value.
    #[error("empty parameter")]
    Empty,

    /// The parameter was present but not a valid number for the requested
    /// width.
    #[error("parameter must be a valid number")]
    Invalid,
}

/// A single raw parameter value with checked conversions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Param(String);

impl Param {
    /// Wraps a raw parameter value.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the raw value without any validation.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.0
    }

    /// Returns the value as a string, rejecting empty parameters.
    pub fn as_str(&self) -> Result<&str, ParamError> {
        if self.0.is_empty() {
            return Err(ParamError::Empty);
        }
        Ok(&self.0)
    }

    /// Parses the value as a 64-bit integer.
    pub fn as_i64(&self) -> Result<i64, ParamError> {
        self.integer()
    }

    /// Parses the value as a 32-bit integer.
    pub fn as_i32(&self) -> Result<i32, ParamError> {
        self.integer()
    }

    /// Parses the value as a 16-bit integer.
    pub fn as_i16(&self) -> Result<i16, ParamError> {
        self.integer()
    }

    /// Parses the value as an 8-bit integer.
    pub fn as_i8(&self) -> Result<i8, ParamError> {
        self.integer()
    }

    /// Width-checked integer parse; the target type carries the width, so
    /// overflow is rejected as invalid rather than wrapped.
    fn integer<T: std::str::FromStr<Err = std::num::ParseIntError>>(
        &self,
    ) -> Result<T, ParamError> {
        if self.0.is_empty() {
            return Err(ParamError::Empty);
        }
        self.0.parse().map_err(|_| ParamError::Invalid)
    }
}

/// A named collection of parameters.
///
/// Lookups never fail: an absent name yields an empty [`Param`], whose
/// checked accessors then report [`ParamError::Empty`].
#[derive(Debug, Clone, Default)]
pub struct Params(HashMap<String, Param>);

impl Params {
    /// Creates an empty parameter map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a named parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), Param::new(value));
    }

    /// Returns the named parameter, or an empty one if absent.
    #[must_use]
    pub fn get(&self, name: &str) -> Param {
        self.0.get(name).cloned().unwrap_or_default()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the map holds no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Collects the named path parameters the router extracted for this request.
///
/// Names that were not part of the matched route come back empty.
#[must_use]
pub fn path_params<B>(request: &Request<B>, names: &[&str]) -> Params {
    let route_params = request.extensions().get::<Params>();
    let mut selected = Params::new();
    for name in names {
        let value = route_params
            .map(|params| params.get(name))
            .unwrap_or_default();
        selected.insert(*name, value.raw());
    }
    selected
}

/// Collects the named query string parameters from the request URI.
///
/// Only names present in the query string are included; when a name repeats,
/// the first value wins.
#[must_use]
pub fn query_params<B>(request: &Request<B>, names: &[&str]) -> Params {
    let query = request.uri().query().unwrap_or_default();
    let mut selected = Params::new();
    for name in names {
        let found = query.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == *name).then_some(value)
        });
        if let Some(value) = found {
            selected.insert(*name, value);
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_param_is_rejected() {
        let param = Param::new("");
        assert_eq!(param.as_str(), Err(ParamError::Empty));
        assert_eq!(param.as_i64(), Err(ParamError::Empty));
        assert_eq!(ParamError::Empty.to_string(), "empty parameter");
    }

    #[test]
    fn test_integer_widths() {
        let param = Param::new("42");
        assert_eq!(param.as_i64(), Ok(42));
        assert_eq!(param.as_i32(), Ok(42));
        assert_eq!(param.as_i16(), Ok(42));
        assert_eq!(param.as_i8(), Ok(42));
    }

    #[test]
    fn test_overflow_is_invalid_not_wrapped() {
        let param = Param::new("128");
        assert_eq!(param.as_i8(), Err(ParamError::Invalid));
        assert_eq!(param.as_i16(), Ok(128));

        let param = Param::new("40000");
        assert_eq!(param.as_i16(), Err(ParamError::Invalid));
        assert_eq!(param.as_i32(), Ok(40_000));
    }

    #[test]
    fn test_non_numeric_is_invalid() {
        let param = Param::new("abc");
        assert_eq!(param.as_i64(), Err(ParamError::Invalid));
        assert_eq!(
            ParamError::Invalid.to_string(),
            "parameter must be a valid number"
        );
    }

    #[test]
    fn test_negative_numbers_parse() {
        let param = Param::new("-7");
        assert_eq!(param.as_i64(), Ok(-7));
    }

    #[test]
    fn test_params_lookup_defaults_to_empty() {
        let mut params = Params::new();
        params.insert("id", "9");

        assert_eq!(params.get("id").as_i64(), Ok(9));
        assert_eq!(params.get("missing").as_i64(), Err(ParamError::Empty));
    }

    #[test]
    fn test_path_params_read_router_extensions() {
        let mut route_params = Params::new();
        route_params.insert("id", "42");
        route_params.insert("name", "ripley");

        let mut request = Request::new(());
        request.extensions_mut().insert(route_params);

        let params = path_params(&request, &["id", "unset"]);
        assert_eq!(params.get("id").as_i64(), Ok(42));
        assert_eq!(params.get("unset").as_str(), Err(ParamError::Empty));
    }

    #[test]
    fn test_path_params_without_router_extension() {
        let request = Request::new(());
        let params = path_params(&request, &["id"]);
        assert_eq!(params.get("id").as_i64(), Err(ParamError::Empty));
    }

    #[test]
    fn test_query_params_first_value_wins() {
        let request = Request::builder()
            .uri("/movies?page=2&page=3&sort=title")
            .body(())
            .unwrap();

        let params = query_params(&request, &["page", "sort", "absent"]);
        assert_eq!(params.get("page").as_i64(), Ok(2));
        assert_eq!(params.get("sort").as_str(), Ok("title"));
        // Absent names are not inserted at all.
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_query_param_without_value_is_empty() {
        let request = Request::builder()
            .uri("/movies?flag")
            .body(())
            .unwrap();

        let params = query_params(&request, &["flag"]);
        assert_eq!(params.get("flag").as_str(), Err(ParamError::Empty));
        assert_eq!(params.len(), 1);
    }
}
