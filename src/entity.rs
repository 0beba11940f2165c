//! Capability interface every persistable record type implements.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{document, identity, Encoded, Raw};
use crate::error::Result;
use crate::schema::EntitySchema;

/// A record type with a static schema.
///
/// Only [`Entity::schema`] is required; identity, encoding and decoding are
/// derived from the schema and the type's serde implementation. Nested entity
/// fields dispatch through the nested type's schema, so a field declared as
/// `FieldKind::Entity(Inner::schema)` must hold an `Inner` value.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use tablemap::schema::{EntitySchema, FieldDef, FieldKind};
/// use tablemap::Entity;
///
/// #[derive(Serialize, Deserialize)]
/// struct Sensor {
///     site: String,
///     slot: i64,
///     reading: f64,
/// }
///
/// impl Entity for Sensor {
///     fn schema() -> &'static EntitySchema {
///         static SCHEMA: EntitySchema = EntitySchema::new(
///             "plant",
///             "Sensor",
///             &[
///                 FieldDef::identity("site", FieldKind::String),
///                 FieldDef::identity("slot", FieldKind::Integer),
///                 FieldDef::new("reading", FieldKind::Float),
///             ],
///         );
///         &SCHEMA
///     }
/// }
///
/// let sensor = Sensor { site: "north".into(), slot: 3, reading: 0.5 };
/// assert_eq!(sensor.id().unwrap(), "site=north#slot=3");
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn schema() -> &'static EntitySchema;

    /// Composite identity string. Fails if an identity field is unset.
    fn id(&self) -> Result<String> {
        let schema = Self::schema();
        identity::compose(schema, &document::to_document(schema, self)?)
    }

    /// Flat mapping for scalar-only schemas, structured-text blob otherwise.
    fn encode(&self) -> Result<Encoded> {
        let schema = Self::schema();
        document::encode(schema, document::to_document(schema, self)?)
    }

    /// Inverse of [`Entity::encode`]; accepts a blob or a flat mapping.
    fn decode(raw: impl Into<Raw>) -> Result<Self> {
        let schema = Self::schema();
        let decoded = document::decode(schema, raw.into())?;
        document::from_document(schema, decoded)
    }
}
