//! Composite identity strings.
//!
//! An identity is `name=value` for each identity field in schema order,
//! joined by [`SEPARATOR`]. Field names never contain the separator; values
//! have `%` and the separator percent-escaped so the token boundaries stay
//! unambiguous.

use serde_json::Value;

use super::Document;
use crate::error::{Error, Result};
use crate::schema::{EntitySchema, FieldDef, FieldKind};

/// Token separator inside an identity string.
pub const SEPARATOR: char = '#';

/// Identity-field values supplied by a caller for lookup.
///
/// Entries keep insertion order; the schema decides the order of the
/// composed identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Key {
    fields: Vec<(String, Value)>,
}

impl Key {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Reject names outside the identity set and repeated names.
    pub fn validate(&self, schema: &EntitySchema) -> Result<()> {
        for (i, (name, _)) in self.fields.iter().enumerate() {
            if !schema.is_id_field(name) {
                return Err(Error::Usage(format!(
                    "`{}` is not an identity field of {}",
                    name,
                    schema.type_name()
                )));
            }
            if self.fields[..i].iter().any(|(n, _)| n == name) {
                return Err(Error::Usage(format!(
                    "identity field `{}` given more than once",
                    name
                )));
            }
        }
        Ok(())
    }

    /// `name=value` tokens in schema order.
    pub fn tokens(&self, schema: &EntitySchema) -> Result<Vec<String>> {
        self.validate(schema)?;
        schema
            .id_fields()
            .filter_map(|field| self.get(field.name).map(|value| token(schema, field, value)))
            .collect()
    }

    /// Synthetic document holding the key's values and null everywhere else.
    pub fn to_document(&self, schema: &EntitySchema) -> Result<Document> {
        self.validate(schema)?;
        Ok(schema
            .fields()
            .iter()
            .map(|field| {
                let value = self.get(field.name).cloned().unwrap_or(Value::Null);
                (field.name.to_string(), value)
            })
            .collect())
    }
}

/// Identity string of an encoded record.
pub fn compose(schema: &EntitySchema, document: &Document) -> Result<String> {
    let tokens = schema
        .id_fields()
        .map(|field| {
            let value = document.get(field.name).unwrap_or(&Value::Null);
            token(schema, field, value)
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(tokens.join(&SEPARATOR.to_string()))
}

/// Identity string for a lookup key. Every identity field must be supplied.
pub fn compose_key(schema: &EntitySchema, key: &Key) -> Result<String> {
    let document = key.to_document(schema)?;
    compose(schema, &document)
}

/// Single `name=value` token.
pub fn token(schema: &EntitySchema, field: &FieldDef, value: &Value) -> Result<String> {
    Ok(format!("{}={}", field.name, render(schema, field, value)?))
}

/// Whether `id` carries every token exactly (not just as a substring).
pub fn has_tokens(id: &str, tokens: &[String]) -> bool {
    tokens
        .iter()
        .all(|wanted| id.split(SEPARATOR).any(|token| token == wanted))
}

fn render(schema: &EntitySchema, field: &FieldDef, value: &Value) -> Result<String> {
    let mismatch = || {
        Error::Usage(format!(
            "identity field `{}` of {} should be {}, got {}",
            field.name,
            schema.type_name(),
            field.kind,
            value
        ))
    };

    match (field.kind, value) {
        (_, Value::Null) => Err(Error::MissingIdentity {
            entity: schema.type_name().to_string(),
            field: field.name.to_string(),
        }),
        (FieldKind::String, Value::String(s)) => Ok(escape(s)),
        (FieldKind::Boolean, Value::Bool(b)) => Ok(b.to_string()),
        (FieldKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        (FieldKind::Float, Value::Number(n)) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(|n| n.to_string())
            .ok_or_else(mismatch),
        (kind, _) if !kind.is_scalar() => Err(Error::Schema(format!(
            "identity field `{}` of {} must be a scalar, declared {}",
            field.name,
            schema.type_name(),
            kind
        ))),
        _ => Err(mismatch()),
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => out.push_str("%25"),
            SEPARATOR => out.push_str("%23"),
            c => out.push(c),
        }
    }
    out
}
