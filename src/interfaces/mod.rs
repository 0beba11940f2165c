//! Abstract interfaces for tablemap components.
//!
//! These traits define the contracts for:
//! - Table storage (the backing key-value service)

pub mod table_store;

pub use table_store::{AttributeValue, Row, RowKey, ScanFilter, StoreError, TableStore};
