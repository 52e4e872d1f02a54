//! Value Codec Module
//!
//! The validate + encode + decode capability injected into the engine.

use std::fmt;

use serde_json::Value;

use crate::error::{CacheError, Result};
use crate::schema::Shape;

// == Value Codec ==
/// Checks documents before they reach storage and converts them to and from
/// their stored text form.
///
/// `encode` output must round-trip through `decode` to a deep-equal value.
pub trait ValueCodec: fmt::Debug + Send + Sync {
    /// Returns `CacheError::Validation` when `value` does not conform.
    fn validate(&self, value: &Value) -> Result<()>;

    /// Produces the canonical stored form of an already validated value.
    fn encode(&self, value: &Value) -> Result<String>;

    /// Parses a stored form back into a document.
    fn decode(&self, encoded: &str) -> Result<Value>;
}

// == JSON Codec ==
/// Codec backed by a compiled [`Shape`] and serde_json text.
///
/// Object keys are emitted in sorted order, so equal documents always encode
/// to identical text.
#[derive(Debug, Clone)]
pub struct JsonCodec {
    shape: Shape,
}

impl JsonCodec {
    /// Compiles `descriptor`; a malformed descriptor is a configuration error.
    pub fn compile(descriptor: &Value) -> Result<Self> {
        Ok(Self {
            shape: Shape::compile(descriptor)?,
        })
    }
}

impl ValueCodec for JsonCodec {
    fn validate(&self, value: &Value) -> Result<()> {
        self.shape
            .check(value)
            .map_err(|mismatch| CacheError::Validation(mismatch.to_string()))
    }

    fn encode(&self, value: &Value) -> Result<String> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, encoded: &str) -> Result<Value> {
        Ok(serde_json::from_str(encoded)?)
    }
}
