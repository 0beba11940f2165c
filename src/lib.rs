//! Tablemap - object-document mapping onto range-keyed tables
//!
//! Turns plain serde records into entities persisted in a key-value store
//! with range-query support. Each entity type declares a static schema
//! naming its identity fields; the gateway derives a composite identity,
//! picks a flat or blob encoding, creates the backing table on first use,
//! and optionally keeps every save as timestamped history.

pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod interfaces;
pub mod schema;
pub mod storage;
pub mod table;
pub mod utils;

pub use codec::{Encoded, Key, Raw};
pub use entity::Entity;
pub use error::{DecodeError, Error, Result};
pub use gateway::{Collection, Gateway, TableDeletion};
pub use schema::{EntitySchema, FieldDef, FieldKind};

#[cfg(test)]
pub(crate) mod test_utils;
