//! Strict JSON request-body decoding.
//!
//! [`from_body`] reads a request body through a 1 MiB limit guard and
//! decodes it into the destination shape; [`from_slice`] does the same for
//! an already-buffered body. Decoding is strict in three ways:
//!
//! - the body must contain exactly one JSON document ([`DecodeError::TrailingData`]
//!   otherwise; `{"a":1}{"b":2}` is two documents, not one),
//! - destination shapes are expected to reject unknown fields
//!   (`#[serde(deny_unknown_fields)]`), which this module classifies as
//!   [`DecodeError::UnknownField`],
//! - bodies over [`MAX_BODY_BYTES`] are rejected before parsing.
//!
//! Every failure is classified into a [`DecodeError`] whose `Display` text is
//! safe to hand to clients in a `fail` envelope. Classification happens once,
//! here, at the boundary between transport bytes and structured data; from
//! then on the error is plain data.
//!
//! # Example
//!
//! ```rust
//! use gantry_core::decode;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! #[serde(deny_unknown_fields)]
//! struct CreateMovie {
//!     title: String,
//!     year: u16,
//! }
//!
//! let movie: CreateMovie =
//!     decode::from_slice(br#"{"title": "Arrival", "year": 2016}"#).unwrap();
//! assert_eq!(movie.title, "Arrival");
//! ```

use http_body::Body;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use thiserror::Error;

/// Maximum accepted request body size in bytes (1 MiB).
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// Classified reason a request body failed to decode.
///
/// All variants except [`DecodeError::Other`] are client-caused; handlers
/// turn them into 400-class `fail` envelopes using the `Display` text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The body contained malformed JSON, at the given byte offset when the
    /// parser could attribute one.
    #[error("{}", syntax_message(.offset))]
    Syntax {
        /// Byte offset of the malformed token, if known.
        offset: Option<u64>,
    },

    /// A value was present but had the wrong shape: a named field when the
    /// decoder could attribute one, otherwise the byte offset of the
    /// offending value.
    #[error("{}", type_mismatch_message(.field, .offset))]
    TypeMismatch {
        /// The field the mismatch was attributed to, if any.
        field: Option<String>,
        /// Byte offset of the mismatched value when no field is attributable.
        offset: Option<u64>,
    },

    /// The body contained no JSON value at all.
    #[error("body must not be empty")]
    EmptyBody,

    /// The body contained more than one top-level JSON value.
    #[error("must only contain a single JSON value")]
    TrailingData,

    /// The body exceeded the size limit.
    #[error("must not be larger than {limit} bytes")]
    TooLarge {
        /// The enforced limit in bytes.
        limit: u64,
    },

    /// The body contained a field the destination shape does not define.
    #[error("contains unknown key: {name}")]
    UnknownField {
        /// Name of the unrecognized field.
        name: String,
    },

    /// Any other decode failure; the message is serde's own.
    #[error("{message}")]
    Other {
        /// The underlying decoder message.
        message: String,
    },
}

fn syntax_message(offset: &Option<u64>) -> String {
    match offset {
        Some(offset) => format!("contains badly-formed JSON (at character {offset})"),
        None => "contains badly-formed JSON".to_string(),
    }
}

fn type_mismatch_message(field: &Option<String>, offset: &Option<u64>) -> String {
    match (field, offset) {
        (Some(field), _) => format!("contains incorrect JSON type for field: {field}"),
        (None, Some(offset)) => format!("contains incorrect JSON type (at character {offset})"),
        (None, None) => "contains incorrect JSON type".to_string(),
    }
}

/// Reads a request body through the [`MAX_BODY_BYTES`] limit guard and
/// decodes it into `T`.
///
/// The guard trips as soon as the stream exceeds the limit, before the
/// parser ever sees the bytes, so oversized bodies are rejected regardless
/// of content validity.
pub async fn from_body<T, B>(body: B) -> Result<T, DecodeError>
where
    T: DeserializeOwned,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limited = Limited::new(body, MAX_BODY_BYTES);
    // Box the collection future with a concrete output type so the generic
    // body `B` does not appear in this function's own future. Without this,
    // the `Send` auto-trait check performed when an `async fn` handler built
    // on `from_body` is coerced to a `Fn(_) -> impl Future + Send` bound
    // universally quantifies the boxed error's lifetime and rejects the
    // reflexive `From` impl (rustc issue #102211). Behavior is unchanged.
    type CollectFuture = std::pin::Pin<
        Box<
            dyn std::future::Future<
                    Output = Result<bytes::Bytes, Box<dyn std::error::Error + Send + Sync>>,
                > + Send,
        >,
    >;
    let collect: CollectFuture =
        Box::pin(async move { limited.collect().await.map(|collected| collected.to_bytes()) });
    let bytes = match collect.await {
        Ok(bytes) => bytes,
        Err(err) => return Err(classify_read_failure(err.as_ref())),
    };
    from_slice(&bytes)
}

/// Decodes a buffered body into `T`, enforcing the single-document rule.
///
/// After a successful decode the parser is asked whether the stream is at
/// end-of-input; anything but end-of-input means the body concatenated a
/// second JSON value and is rejected as [`DecodeError::TrailingData`].
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    if bytes.len() > MAX_BODY_BYTES {
        return Err(DecodeError::TooLarge {
            limit: MAX_BODY_BYTES as u64,
        });
    }

    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let value = match T::deserialize(&mut deserializer) {
        Ok(value) => value,
        Err(err) => return Err(classify(&err, bytes)),
    };

    if deserializer.end().is_err() {
        return Err(DecodeError::TrailingData);
    }

    Ok(value)
}

/// Classifies a body-read failure: the limit guard tripping is the only
/// expected case.
fn classify_read_failure(err: &(dyn std::error::Error + Send + Sync + 'static)) -> DecodeError {
    if err.downcast_ref::<LengthLimitError>().is_some()
        || err
            .source()
            .is_some_and(|source| source.downcast_ref::<LengthLimitError>().is_some())
    {
        DecodeError::TooLarge {
            limit: MAX_BODY_BYTES as u64,
        }
    } else {
        DecodeError::Other {
            message: err.to_string(),
        }
    }
}

/// Maps a serde_json failure onto the [`DecodeError`] taxonomy.
fn classify(err: &serde_json::Error, input: &[u8]) -> DecodeError {
    match err.classify() {
        Category::Eof => {
            // Nothing but whitespace consumed means the body was empty;
            // a truncated value is malformed JSON with no single offset.
            if input.iter().all(u8::is_ascii_whitespace) {
                DecodeError::EmptyBody
            } else {
                DecodeError::Syntax { offset: None }
            }
        }
        Category::Syntax => DecodeError::Syntax {
            offset: Some(byte_offset(input, err.line(), err.column())),
        },
        Category::Data => classify_data(err, input),
        Category::Io => DecodeError::Other {
            message: err.to_string(),
        },
    }
}

/// Shape errors: serde reports these as messages, so classification matches
/// on the stable message prefixes the derive machinery produces.
fn classify_data(err: &serde_json::Error, input: &[u8]) -> DecodeError {
    let message = err.to_string();

    if let Some(name) = quoted_field(&message, "unknown field `") {
        return DecodeError::UnknownField { name };
    }

    let named = quoted_field(&message, "missing field `")
        .or_else(|| quoted_field(&message, "duplicate field `"));
    if let Some(field) = named {
        return DecodeError::TypeMismatch {
            field: Some(field),
            offset: None,
        };
    }

    if message.starts_with("invalid type")
        || message.starts_with("invalid value")
        || message.starts_with("invalid length")
    {
        return DecodeError::TypeMismatch {
            field: None,
            offset: Some(byte_offset(input, err.line(), err.column())),
        };
    }

    DecodeError::Other { message }
}

/// Extracts the backtick-quoted name following `prefix` in a serde message.
fn quoted_field(message: &str, prefix: &str) -> Option<String> {
    let start = message.find(prefix)? + prefix.len();
    let rest = &message[start..];
    let end = rest.find('`')?;
    Some(rest[..end].to_string())
}

/// Converts serde_json's one-based line/column into a byte offset into the
/// input, for the "at character N" messages.
fn byte_offset(input: &[u8], line: usize, column: usize) -> u64 {
    let mut newlines_to_skip = line.saturating_sub(1);
    let mut line_start = 0usize;
    for (index, byte) in input.iter().enumerate() {
        if newlines_to_skip == 0 {
            break;
        }
        if *byte == b'\n' {
            newlines_to_skip -= 1;
            line_start = index + 1;
        }
    }
    (line_start + column) as u64
}
