//! Entity fixtures shared by gateway tests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tablemap::config::DeletionConfig;
use tablemap::schema::{EntitySchema, FieldDef, FieldKind};
use tablemap::storage::InMemoryTableStore;
use tablemap::{Entity, Gateway};

fn default_b() -> i64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct A {
    pub i_k: i64,
    pub s_k: String,
    pub s: String,
    #[serde(default = "default_b")]
    pub b: i64,
}

impl A {
    pub fn new(i_k: i64, s_k: &str, s: &str) -> Self {
        Self {
            i_k,
            s_k: s_k.to_string(),
            s: s.to_string(),
            b: default_b(),
        }
    }
}

const A_FIELDS: &[FieldDef] = &[
    FieldDef::identity("i_k", FieldKind::Integer),
    FieldDef::identity("s_k", FieldKind::String),
    FieldDef::new("s", FieldKind::String),
    FieldDef::new("b", FieldKind::Integer),
];

impl Entity for A {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new("tests", "A", A_FIELDS);
        &SCHEMA
    }
}

/// Same fields as [`A`], keeping history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct B {
    pub i_k: i64,
    pub s_k: String,
    pub s: String,
    #[serde(default = "default_b")]
    pub b: i64,
}

impl Entity for B {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new("tests", "B", A_FIELDS).with_history();
        &SCHEMA
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    pub idf: i64,
    pub la: Vec<A>,
}

impl Entity for Complex {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "tests",
            "Complex",
            &[
                FieldDef::identity("idf", FieldKind::Integer),
                FieldDef::new("la", FieldKind::EntityList(A::schema)),
            ],
        );
        &SCHEMA
    }
}

/// Gateway over a fresh in-memory store with fast deletion polling.
pub fn gateway() -> (Arc<InMemoryTableStore>, Gateway) {
    tablemap::utils::bootstrap::init_tracing();
    let store = Arc::new(InMemoryTableStore::new());
    let gateway = Gateway::new(store.clone()).with_deletion_policy(DeletionConfig {
        max_retries: 5,
        poll_interval_ms: 1,
    });
    (store, gateway)
}
