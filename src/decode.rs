//! Payload decoders
//!
//! Boundary callbacks deliver their results as strings. A decoder turns such a
//! payload back into a typed value. Decoding is otherwise a black box to the
//! correlation layer, the only thing it relies on is that a malformed payload
//! is reported as a `DecodeError` instead of a panic.

use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;


/// Failure to decode a boundary payload
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to decode payload {payload:?}: {reason}")]
pub struct DecodeError {
    /// Payload which could not be decoded
    pub payload: String,

    /// Human-readable explanation
    pub reason: String,
}
//
impl DecodeError {
    /// Build a decode error for a given payload
    pub fn new(payload: &str, reason: impl Display) -> Self {
        DecodeError {
            payload: payload.to_owned(),
            reason: reason.to_string(),
        }
    }
}


/// Shared payload decoder
pub type Decoder<V> = Arc<dyn Fn(&str) -> Result<V, DecodeError> + Send + Sync>;


/// Decode JSON payloads with serde
pub fn json<V: DeserializeOwned + 'static>() -> Decoder<V> {
    Arc::new(|payload: &str| {
        serde_json::from_str(payload).map_err(|e| DecodeError::new(payload, e))
    })
}

/// Decode payloads through their `FromStr` implementation
pub fn parse<V>() -> Decoder<V>
    where V: FromStr + 'static,
          V::Err: Display
{
    Arc::new(|payload: &str| {
        payload.parse().map_err(|e| DecodeError::new(payload, e))
    })
}

/// Keep payloads as they are, e.g. for plain-text error messages
pub fn verbatim() -> Decoder<String> {
    Arc::new(|payload: &str| Ok(payload.to_owned()))
}
