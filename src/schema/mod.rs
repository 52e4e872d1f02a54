//! Schema Module
//!
//! Turns a shape descriptor into the validate/encode capability the cache
//! engine consumes.

mod codec;
mod shape;

pub use codec::{JsonCodec, ValueCodec};
pub use shape::{Shape, ShapeMismatch, ValueType};
