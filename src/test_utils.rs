//! Test fixtures: entity types covering flat, history and nested schemas.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DeletionConfig;
use crate::entity::Entity;
use crate::gateway::Gateway;
use crate::schema::{EntitySchema, FieldDef, FieldKind};
use crate::storage::InMemoryTableStore;

fn default_b() -> i64 {
    10
}

/// Flat entity with a two-field identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub i_k: i64,
    pub s_k: String,
    pub s: String,
    #[serde(default = "default_b")]
    pub b: i64,
}

impl Account {
    pub fn new(i_k: i64, s_k: &str, s: &str) -> Self {
        Self {
            i_k,
            s_k: s_k.to_string(),
            s: s.to_string(),
            b: default_b(),
        }
    }
}

impl Entity for Account {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "test",
            "Account",
            &[
                FieldDef::identity("i_k", FieldKind::Integer),
                FieldDef::identity("s_k", FieldKind::String),
                FieldDef::new("s", FieldKind::String),
                FieldDef::new("b", FieldKind::Integer),
            ],
        );
        &SCHEMA
    }
}

/// Same shape as [`Account`], retaining every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub i_k: i64,
    pub s_k: String,
    pub s: String,
    pub ratio: f64,
    pub open: bool,
}

impl Entity for Ledger {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "test",
            "Ledger",
            &[
                FieldDef::identity("i_k", FieldKind::Integer),
                FieldDef::identity("s_k", FieldKind::String),
                FieldDef::new("s", FieldKind::String),
                FieldDef::new("ratio", FieldKind::Float),
                FieldDef::new("open", FieldKind::Boolean),
            ],
        )
        .with_history();
        &SCHEMA
    }
}

/// Complex entity holding a single nested entity and a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub idf: i64,
    pub owner: Option<Account>,
    pub la: Vec<Account>,
    pub tags: Vec<String>,
}

impl Entity for Portfolio {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "test",
            "Portfolio",
            &[
                FieldDef::identity("idf", FieldKind::Integer),
                FieldDef::new("owner", FieldKind::Entity(Account::schema)),
                FieldDef::new("la", FieldKind::EntityList(Account::schema)),
                FieldDef::new("tags", FieldKind::Other("list[string]")),
            ],
        );
        &SCHEMA
    }
}

/// Two levels of nesting, kept as history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Archive {
    pub name: String,
    pub portfolios: Vec<Portfolio>,
}

impl Entity for Archive {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "test",
            "Archive",
            &[
                FieldDef::identity("name", FieldKind::String),
                FieldDef::new("portfolios", FieldKind::EntityList(Portfolio::schema)),
            ],
        )
        .with_history();
        &SCHEMA
    }
}

/// Complex entity whose nested records carry floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub entries: Vec<Ledger>,
}

impl Entity for Book {
    fn schema() -> &'static EntitySchema {
        static SCHEMA: EntitySchema = EntitySchema::new(
            "test",
            "Book",
            &[
                FieldDef::identity("title", FieldKind::String),
                FieldDef::new("entries", FieldKind::EntityList(Ledger::schema)),
            ],
        );
        &SCHEMA
    }
}

pub fn ledger(i_k: i64, ratio: f64) -> Ledger {
    Ledger {
        i_k,
        s_k: "k".to_string(),
        s: "s".to_string(),
        ratio,
        open: true,
    }
}

pub fn portfolio(idf: i64) -> Portfolio {
    Portfolio {
        idf,
        owner: Some(Account::new(7, "owner", "o")),
        la: vec![Account::new(1, "same", "a1"), Account::new(2, "same", "b2")],
        tags: vec!["x".to_string(), "y".to_string()],
    }
}

/// Gateway over a fresh in-memory store with fast deletion polling.
pub fn memory_gateway() -> (Arc<InMemoryTableStore>, Gateway) {
    let store = Arc::new(InMemoryTableStore::new());
    let gateway = Gateway::new(store.clone()).with_deletion_policy(DeletionConfig {
        max_retries: 3,
        poll_interval_ms: 1,
    });
    (store, gateway)
}
