//! Flat and blob encodings of entity documents.
//!
//! Encoding walks the schema so nested entities are written through their
//! own schema, keyed in field order. Decoding runs in two passes: the first
//! checks every top-level field against the schema and its scalar type, the
//! second replaces nested entity values (mappings or encoded blobs) with the
//! result of decoding them through the nested schema.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::Document;
use crate::error::{DecodeError, Error, Result};
use crate::schema::{EntitySchema, FieldKind};

/// Serialized form of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    /// Structured-text blob, for complex schemas.
    Blob(String),
    /// One value per field, for schemas of primitive scalars only.
    Flat(Document),
}

/// Input accepted by decoding: a blob or an already-decoded mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Raw {
    Text(String),
    Mapping(Document),
}

impl From<String> for Raw {
    fn from(text: String) -> Self {
        Raw::Text(text)
    }
}

impl From<&str> for Raw {
    fn from(text: &str) -> Self {
        Raw::Text(text.to_string())
    }
}

impl From<Document> for Raw {
    fn from(mapping: Document) -> Self {
        Raw::Mapping(mapping)
    }
}

impl From<Encoded> for Raw {
    fn from(encoded: Encoded) -> Self {
        match encoded {
            Encoded::Blob(text) => Raw::Text(text),
            Encoded::Flat(mapping) => Raw::Mapping(mapping),
        }
    }
}

/// Serialize a record into its field document.
///
/// Fails on NaN or infinite floats anywhere in the record: the document
/// model would store them as null and the saved row could not be decoded.
pub fn to_document<T: Serialize>(schema: &EntitySchema, record: &T) -> Result<Document> {
    reject_non_finite(schema, record)?;
    match serde_json::to_value(record) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(encoding(schema, format!("expected a struct, got {}", other))),
        Err(e) => Err(encoding(schema, e.to_string())),
    }
}

/// Build a typed record from a decoded document.
pub fn from_document<T: DeserializeOwned>(schema: &EntitySchema, document: Document) -> Result<T> {
    serde_json::from_value(Value::Object(document)).map_err(|e| {
        DecodeError::Conversion {
            entity: schema.type_name().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// Choose the encoding for `document` from the schema.
pub fn encode(schema: &EntitySchema, document: Document) -> Result<Encoded> {
    if !schema.is_complex() {
        return Ok(Encoded::Flat(document));
    }
    let ordered = ordered_mapping(schema, &document)?;
    serde_yaml::to_string(&ordered)
        .map(Encoded::Blob)
        .map_err(|e| encoding(schema, e.to_string()))
}

/// Decode a blob or mapping into a schema-checked document.
pub fn decode(schema: &EntitySchema, raw: Raw) -> Result<Document> {
    let mut document = match raw {
        Raw::Text(text) => parse_blob(schema, &text)?,
        Raw::Mapping(mapping) => mapping,
    };

    for (name, value) in &document {
        let field = schema
            .field(name)
            .ok_or_else(|| DecodeError::UnknownField {
                entity: schema.type_name().to_string(),
                field: name.clone(),
            })?;
        check_scalar(schema, name, field.kind, value)?;
    }

    for field in schema.fields() {
        let Some(value) = document.get_mut(field.name) else {
            continue;
        };
        match field.kind {
            FieldKind::Entity(nested) => {
                *value = decode_nested(schema, field.name, nested(), value.take())?;
            }
            FieldKind::EntityList(nested) => {
                *value = match value.take() {
                    Value::Null => Value::Null,
                    Value::Array(items) => Value::Array(
                        items
                            .into_iter()
                            .map(|item| decode_nested(schema, field.name, nested(), item))
                            .collect::<Result<Vec<_>>>()?,
                    ),
                    other => {
                        return Err(mismatch(schema, field.name, &field.kind, &other).into());
                    }
                };
            }
            _ => {}
        }
    }

    Ok(document)
}

fn decode_nested(
    parent: &EntitySchema,
    field: &str,
    nested: &EntitySchema,
    value: Value,
) -> Result<Value> {
    let raw = match value {
        Value::Null => return Ok(Value::Null),
        Value::String(text) => Raw::Text(text),
        Value::Object(mapping) => Raw::Mapping(mapping),
        other => {
            return Err(DecodeError::TypeMismatch {
                entity: parent.type_name().to_string(),
                field: field.to_string(),
                expected: nested.type_name().to_string(),
                found: describe(&other),
            }
            .into())
        }
    };
    decode(nested, raw).map(Value::Object)
}

fn parse_blob(schema: &EntitySchema, text: &str) -> Result<Document> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| DecodeError::Malformed {
        entity: schema.type_name().to_string(),
        message: e.to_string(),
    })?;
    match value {
        Value::Object(document) => Ok(document),
        other => Err(DecodeError::NotAMapping {
            entity: schema.type_name().to_string(),
            found: describe(&other),
        }
        .into()),
    }
}

fn check_scalar(
    schema: &EntitySchema,
    name: &str,
    kind: FieldKind,
    value: &Value,
) -> std::result::Result<(), DecodeError> {
    let ok = match (kind, value) {
        (_, Value::Null) => true,
        (FieldKind::Boolean, v) => v.is_boolean(),
        (FieldKind::String, v) => v.is_string(),
        (FieldKind::Integer, v) => v.is_i64() || v.is_u64(),
        (FieldKind::Float, v) => v.is_number(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(mismatch(schema, name, &kind, value))
    }
}

/// Schema-ordered YAML mapping, recursing into nested entity schemas.
fn ordered_mapping(schema: &EntitySchema, document: &Document) -> Result<serde_yaml::Value> {
    if let Some(unknown) = document.keys().find(|name| schema.field(name).is_none()) {
        return Err(encoding(schema, format!("field `{}` is not in the schema", unknown)));
    }

    let mut mapping = serde_yaml::Mapping::new();
    for field in schema.fields() {
        let Some(value) = document.get(field.name) else {
            continue;
        };
        let encoded = match (field.kind, value) {
            (_, Value::Null) => serde_yaml::Value::Null,
            (FieldKind::Entity(nested), Value::Object(inner)) => ordered_mapping(nested(), inner)?,
            (FieldKind::EntityList(nested), Value::Array(items)) => serde_yaml::Value::Sequence(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Object(inner) => ordered_mapping(nested(), inner),
                        other => Err(encoding(
                            schema,
                            format!("`{}` element is {}, not an entity", field.name, describe(other)),
                        )),
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            (FieldKind::Entity(_) | FieldKind::EntityList(_), other) => {
                return Err(encoding(
                    schema,
                    format!("`{}` holds {}, expected {}", field.name, describe(other), field.kind),
                ))
            }
            (_, other) => {
                serde_yaml::to_value(other).map_err(|e| encoding(schema, e.to_string()))?
            }
        };
        mapping.insert(serde_yaml::Value::String(field.name.to_string()), encoded);
    }
    Ok(serde_yaml::Value::Mapping(mapping))
}

fn reject_non_finite<T: Serialize>(schema: &EntitySchema, record: &T) -> Result<()> {
    let value = serde_yaml::to_value(record).map_err(|e| encoding(schema, e.to_string()))?;
    match non_finite_path(&value) {
        Some(path) => Err(encoding(
            schema,
            format!("`{}` holds a non-finite float", path.trim_start_matches('.')),
        )),
        None => Ok(()),
    }
}

/// Path of the first NaN or infinite number, e.g. `.la[0].ratio`.
fn non_finite_path(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Number(n) if n.is_nan() || n.is_infinite() => Some(String::new()),
        serde_yaml::Value::Sequence(items) => items.iter().enumerate().find_map(|(i, item)| {
            non_finite_path(item).map(|rest| format!("[{}]{}", i, rest))
        }),
        serde_yaml::Value::Mapping(mapping) => mapping.iter().find_map(|(key, item)| {
            non_finite_path(item).map(|rest| match key.as_str() {
                Some(name) => format!(".{}{}", name, rest),
                None => format!(".{:?}{}", key, rest),
            })
        }),
        serde_yaml::Value::Tagged(tagged) => non_finite_path(&tagged.value),
        _ => None,
    }
}

fn mismatch(schema: &EntitySchema, name: &str, kind: &FieldKind, value: &Value) -> DecodeError {
    DecodeError::TypeMismatch {
        entity: schema.type_name().to_string(),
        field: name.to_string(),
        expected: kind.to_string(),
        found: describe(value),
    }
}

fn encoding(schema: &EntitySchema, message: String) -> Error {
    Error::Encoding {
        entity: schema.type_name().to_string(),
        message,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(n) if n.is_f64() => "float".to_string(),
        Value::Number(_) => "integer".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(_) => "list".to_string(),
        Value::Object(_) => "mapping".to_string(),
    }
}
