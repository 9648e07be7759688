//! State change records
//!
//! Instead of whole snapshots, a producer may push individual changes to its
//! consumers: "this field went from that value to this value". Since changes
//! have to cross the boundary in encoded form, they travel as an untyped
//! record where the field is named by a string and values are strings too.
//!
//! On the consumer side, the untyped record is converted into a closed enum of
//! the fields which the consumer knows about. Any other field name is reported
//! as an error instead of being silently ignored.

use crate::decode::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;


/// Encoded change of one field of a producer's state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntypedStateChange {
    /// Name of the field which changed
    pub target: String,

    /// Previous value of the field, if it had one
    pub old_value: Option<String>,

    /// New value of the field
    pub new_value: String,
}
//
impl UntypedStateChange {
    /// Record the change of a field
    pub fn new<V: ToString>(target: &str, old_value: Option<V>, new_value: V) -> Self {
        UntypedStateChange {
            target: target.to_owned(),
            old_value: old_value.map(|value| value.to_string()),
            new_value: new_value.to_string(),
        }
    }

    /// Decode a change from its JSON encoding
    pub fn from_json(payload: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(payload).map_err(|e| DecodeError::new(payload, e))
    }

    /// Encode the change as JSON
    pub fn to_json(&self) -> String {
        // A struct of strings always has a JSON representation
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse the previous value of the field
    pub fn parse_old<V>(&self) -> Result<Option<V>, ChangeError>
        where V: FromStr,
              V::Err: Display
    {
        self.old_value
            .as_deref()
            .map(|value| self.parse(value))
            .transpose()
    }

    /// Parse the new value of the field
    pub fn parse_new<V>(&self) -> Result<V, ChangeError>
        where V: FromStr,
              V::Err: Display
    {
        self.parse(&self.new_value)
    }

    fn parse<V>(&self, value: &str) -> Result<V, ChangeError>
        where V: FromStr,
              V::Err: Display
    {
        value.parse().map_err(|e: V::Err| ChangeError::InvalidValue {
            target: self.target.clone(),
            value: value.to_owned(),
            reason: e.to_string(),
        })
    }
}


/// Failure to make sense of a state change
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChangeError {
    /// The change record itself could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The change concerns a field which the consumer does not know about
    #[error("unknown state change target {0:?}")]
    UnknownTarget(String),

    /// A value of the change could not be parsed as the field's type
    #[error("invalid value {value:?} for {target}: {reason}")]
    InvalidValue {
        target: String,
        value: String,
        reason: String,
    },
}


/// Typed view of the changes of a producer's state
pub trait StateChange: Sized {
    /// Interpret an untyped change record
    fn from_untyped(change: &UntypedStateChange) -> Result<Self, ChangeError>;

    /// Decode and interpret a JSON-encoded change record
    fn from_json(payload: &str) -> Result<Self, ChangeError> {
        Self::from_untyped(&UntypedStateChange::from_json(payload)?)
    }
}
