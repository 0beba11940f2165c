//! Error taxonomy for the mapping layer.

use thiserror::Error;

use crate::interfaces::StoreError;

/// Failures while turning stored data back into typed records.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed encoded data for {entity}: {message}")]
    Malformed { entity: String, message: String },

    #[error("Expected a field mapping for {entity}, got {found}")]
    NotAMapping { entity: String, found: String },

    #[error("Unknown field `{field}` for {entity}")]
    UnknownField { entity: String, field: String },

    #[error("Field `{field}` of {entity} should be {expected}, got {found}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("Stored row for {entity} is missing attribute `{attribute}`")]
    MissingAttribute { entity: String, attribute: String },

    #[error("Cannot build {entity} from decoded fields: {message}")]
    Conversion { entity: String, message: String },
}

/// Errors surfaced by the schema, codec, table mapping and gateway.
#[derive(Debug, Error)]
pub enum Error {
    /// Schema cannot be mapped onto a table. Raised at mapping time.
    #[error("Schema error: {0}")]
    Schema(String),

    /// Caller passed arguments the operation does not accept.
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Identity field `{field}` of {entity} is not set")]
    MissingIdentity { entity: String, field: String },

    /// More rows share a key than the table layout allows.
    #[error("Integrity violation: {count} rows share id `{id}` in table {table}")]
    Integrity {
        table: String,
        id: String,
        count: usize,
    },

    #[error("Decoding error: {0}")]
    Decoding(#[from] DecodeError),

    #[error("Encoding error for {entity}: {message}")]
    Encoding { entity: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, Error>;
