//! Static description of a persistable record type.
//!
//! An [`EntitySchema`] lists the fields of a record in declaration order,
//! marks which of them form the record's identity, and says whether every
//! save should be retained as history. Schemas are built in `const` context
//! and live in a `static` next to the type they describe:
//!
//! ```
//! use tablemap::schema::{EntitySchema, FieldDef, FieldKind};
//!
//! static ACCOUNT: EntitySchema = EntitySchema::new(
//!     "billing",
//!     "Account",
//!     &[
//!         FieldDef::identity("tenant", FieldKind::String),
//!         FieldDef::identity("number", FieldKind::Integer),
//!         FieldDef::new("balance", FieldKind::Float),
//!     ],
//! );
//!
//! assert!(!ACCOUNT.is_complex());
//! assert_eq!(ACCOUNT.collection_name(), "billing_Account");
//! ```

use std::fmt;

/// Semantic type of a schema field.
///
/// Nested entity kinds hold a pointer to the nested type's schema accessor,
/// so encode/decode can recurse through the nested schema without knowing
/// the Rust type.
#[derive(Clone, Copy)]
pub enum FieldKind {
    Boolean,
    String,
    Integer,
    Float,
    /// A single nested entity.
    Entity(fn() -> &'static EntitySchema),
    /// An ordered sequence of nested entities of one type.
    EntityList(fn() -> &'static EntitySchema),
    /// Any other structured value (maps, scalar lists, ...). Stored opaquely.
    Other(&'static str),
}

impl FieldKind {
    /// Whether values of this kind can be stored as a plain table attribute.
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldKind::Boolean | FieldKind::String | FieldKind::Integer | FieldKind::Float
        )
    }

    /// Schema of the nested entity type, for entity and entity-list kinds.
    pub fn nested(&self) -> Option<&'static EntitySchema> {
        match self {
            FieldKind::Entity(schema) | FieldKind::EntityList(schema) => Some(schema()),
            _ => None,
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Boolean => f.write_str("Boolean"),
            FieldKind::String => f.write_str("String"),
            FieldKind::Integer => f.write_str("Integer"),
            FieldKind::Float => f.write_str("Float"),
            FieldKind::Entity(schema) => write!(f, "Entity({})", schema().type_name()),
            FieldKind::EntityList(schema) => write!(f, "EntityList({})", schema().type_name()),
            FieldKind::Other(name) => write!(f, "Other({})", name),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Boolean => f.write_str("boolean"),
            FieldKind::String => f.write_str("string"),
            FieldKind::Integer => f.write_str("integer"),
            FieldKind::Float => f.write_str("float"),
            FieldKind::Entity(schema) => f.write_str(schema().type_name()),
            FieldKind::EntityList(schema) => write!(f, "list[{}]", schema().type_name()),
            FieldKind::Other(name) => f.write_str(name),
        }
    }
}

/// One field of an entity schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub identity: bool,
}

impl FieldDef {
    /// A regular (non-identity) field.
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            identity: false,
        }
    }

    /// A field that takes part in the composite identity.
    pub const fn identity(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            identity: true,
        }
    }
}

/// Immutable description of one record type.
#[derive(Debug)]
pub struct EntitySchema {
    namespace: &'static str,
    type_name: &'static str,
    fields: &'static [FieldDef],
    keep_history: bool,
}

impl EntitySchema {
    /// Panics unless at least one field is an identity field. In a `static`
    /// initializer this fails the build instead.
    pub const fn new(
        namespace: &'static str,
        type_name: &'static str,
        fields: &'static [FieldDef],
    ) -> Self {
        let mut i = 0;
        let mut has_identity = false;
        while i < fields.len() {
            has_identity |= fields[i].identity;
            i += 1;
        }
        assert!(has_identity, "entity schema needs at least one identity field");

        Self {
            namespace,
            type_name,
            fields,
            keep_history: false,
        }
    }

    /// Retain every save as a separate timestamped row.
    pub const fn with_history(mut self) -> Self {
        self.keep_history = true;
        self
    }

    pub const fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub const fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    pub const fn keep_history(&self) -> bool {
        self.keep_history
    }

    /// True when any field is not a primitive scalar, which forces the
    /// record into a single encoded `data` attribute.
    pub fn is_complex(&self) -> bool {
        self.fields.iter().any(|f| !f.kind.is_scalar())
    }

    /// Identity fields in declaration order.
    pub fn id_fields(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields.iter().filter(|f| f.identity)
    }

    pub fn is_id_field(&self, name: &str) -> bool {
        self.id_fields().any(|f| f.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Backing table name: `{namespace}_{TypeName}`.
    pub fn collection_name(&self) -> String {
        format!("{}_{}", self.namespace, self.type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static POINT: EntitySchema = EntitySchema::new(
        "geo",
        "Point",
        &[
            FieldDef::identity("x", FieldKind::Integer),
            FieldDef::new("label", FieldKind::String),
            FieldDef::identity("y", FieldKind::Integer),
        ],
    );

    fn point() -> &'static EntitySchema {
        &POINT
    }

    static PATH: EntitySchema = EntitySchema::new(
        "geo",
        "Path",
        &[
            FieldDef::identity("name", FieldKind::String),
            FieldDef::new("points", FieldKind::EntityList(point)),
        ],
    )
    .with_history();

    static TAGGED: EntitySchema = EntitySchema::new(
        "geo",
        "Tagged",
        &[
            FieldDef::identity("name", FieldKind::String),
            FieldDef::new("tags", FieldKind::Other("list[string]")),
        ],
    );

    #[test]
    fn test_scalar_schema_is_not_complex() {
        assert!(!POINT.is_complex());
        assert!(!POINT.keep_history());
    }

    #[test]
    fn test_nested_or_opaque_fields_make_schema_complex() {
        assert!(PATH.is_complex());
        assert!(TAGGED.is_complex());
        assert!(PATH.keep_history());
    }

    #[test]
    fn test_id_fields_keep_declaration_order() {
        let names: Vec<_> = POINT.id_fields().map(|f| f.name).collect();
        assert_eq!(names, vec!["x", "y"]);
        assert!(POINT.is_id_field("y"));
        assert!(!POINT.is_id_field("label"));
    }

    #[test]
    fn test_collection_name() {
        assert_eq!(PATH.collection_name(), "geo_Path");
    }

    #[test]
    #[should_panic(expected = "at least one identity field")]
    fn test_schema_without_identity_field_panics() {
        const FIELDS: &[FieldDef] = &[FieldDef::new("label", FieldKind::String)];
        let _ = EntitySchema::new("geo", "Bare", FIELDS);
    }

    #[test]
    fn test_nested_schema_lookup() {
        let points = PATH.field("points").expect("field exists");
        assert_eq!(points.kind.nested().map(|s| s.type_name()), Some("Point"));
        assert_eq!(points.kind.to_string(), "list[Point]");
        assert!(POINT.field("x").unwrap().kind.nested().is_none());
    }
}
