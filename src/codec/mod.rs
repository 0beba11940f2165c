//! Identity and serialization engine.
//!
//! - [`identity`] composes the composite identity string of a record or a
//!   lookup key and matches identity tokens.
//! - [`document`] picks between flat and blob encodings and recursively
//!   encodes/decodes nested entities through their own schemas.

pub mod document;
pub mod identity;

pub use document::{Encoded, Raw};
pub use identity::{Key, SEPARATOR};

/// Field name to value mapping of one record.
pub type Document = serde_json::Map<String, serde_json::Value>;
