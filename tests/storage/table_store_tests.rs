//! TableStore interface tests.
//!
//! These tests verify the contract of the TableStore trait.
//! Each storage implementation should run these tests. Every test works on
//! its own table, named from `prefix`, and drops it when done.

use tablemap::interfaces::{AttributeValue, Row, RowKey, ScanFilter, StoreError, TableStore};
use tablemap::table::{
    AttributeType, KeyAttribute, KeySchema, TableDefinition, HISTORY_TIMESTAMP, ID_ATTRIBUTE,
};

fn definition(name: String, ranged: bool) -> TableDefinition {
    TableDefinition {
        name,
        key_schema: KeySchema {
            partition: KeyAttribute {
                name: ID_ATTRIBUTE.to_string(),
                attribute_type: AttributeType::Text,
            },
            range: ranged.then(|| KeyAttribute {
                name: HISTORY_TIMESTAMP.to_string(),
                attribute_type: AttributeType::Timestamp,
            }),
        },
        attributes: vec![("payload".to_string(), AttributeType::Text)],
    }
}

fn row(id: &str, range: Option<&str>, payload: &str) -> Row {
    let mut row = Row::new();
    row.insert(ID_ATTRIBUTE.to_string(), AttributeValue::S(id.to_string()));
    if let Some(range) = range {
        row.insert(HISTORY_TIMESTAMP.to_string(), AttributeValue::S(range.to_string()));
    }
    row.insert("payload".to_string(), AttributeValue::S(payload.to_string()));
    row
}

fn payload(row: &Row) -> &str {
    row.get("payload")
        .and_then(AttributeValue::as_s)
        .expect("payload attribute")
}

async fn create<S: TableStore>(store: &S, name: String, ranged: bool) -> String {
    store
        .create_table(&definition(name.clone(), ranged))
        .await
        .expect("create_table should succeed");
    name
}

async fn drop_table<S: TableStore>(store: &S, name: &str) {
    let _ = store.delete_table(name).await;
}

// =============================================================================
// Table lifecycle
// =============================================================================

pub async fn test_create_and_exists<S: TableStore>(store: &S, prefix: &str) {
    let name = format!("{}_lifecycle", prefix);
    assert!(!store.table_exists(&name).await.unwrap());

    create(store, name.clone(), false).await;
    assert!(store.table_exists(&name).await.unwrap());

    drop_table(store, &name).await;
}

pub async fn test_create_twice_reports_exists<S: TableStore>(store: &S, prefix: &str) {
    let name = create(store, format!("{}_twice", prefix), false).await;

    let result = store.create_table(&definition(name.clone(), false)).await;
    assert!(
        matches!(result, Err(StoreError::TableExists(_))),
        "second create should report TableExists"
    );

    drop_table(store, &name).await;
}

pub async fn test_delete_missing_table<S: TableStore>(store: &S, prefix: &str) {
    let result = store.delete_table(&format!("{}_never", prefix)).await;
    assert!(matches!(result, Err(StoreError::TableNotFound(_))));
}

// =============================================================================
// Rows
// =============================================================================

pub async fn test_put_and_get<S: TableStore>(store: &S, prefix: &str) {
    let name = create(store, format!("{}_put_get", prefix), false).await;

    store.put_row(&name, row("a=1", None, "one")).await.unwrap();

    let fetched = store
        .get_row(&name, &RowKey::partition("a=1"))
        .await
        .expect("get_row should succeed")
        .expect("row should exist");
    assert_eq!(payload(&fetched), "one");

    let missing = store.get_row(&name, &RowKey::partition("a=2")).await.unwrap();
    assert!(missing.is_none(), "nonexistent row should be None");

    drop_table(store, &name).await;
}

pub async fn test_put_replaces_same_key<S: TableStore>(store: &S, prefix: &str) {
    let name = create(store, format!("{}_replace", prefix), false).await;

    store.put_row(&name, row("a=1", None, "first")).await.unwrap();
    store.put_row(&name, row("a=1", None, "second")).await.unwrap();

    let rows = store.query(&name, "a=1").await.unwrap();
    assert_eq!(rows.len(), 1, "same key should be replaced");
    assert_eq!(payload(&rows[0]), "second");

    drop_table(store, &name).await;
}

pub async fn test_query_orders_by_range<S: TableStore>(store: &S, prefix: &str) {
    let name = create(store, format!("{}_ranged", prefix), true).await;

    store
        .put_row(&name, row("a=1", Some("2024-01-01T00:00:02.000000000Z"), "second"))
        .await
        .unwrap();
    store
        .put_row(&name, row("a=1", Some("2024-01-01T00:00:01.000000000Z"), "first"))
        .await
        .unwrap();
    store
        .put_row(&name, row("a=2", Some("2024-01-01T00:00:03.000000000Z"), "other"))
        .await
        .unwrap();

    let rows = store.query(&name, "a=1").await.unwrap();
    let payloads: Vec<_> = rows.iter().map(payload).collect();
    assert_eq!(payloads, vec!["first", "second"]);

    let exact = store
        .get_row(&name, &RowKey::with_range("a=1", "2024-01-01T00:00:02.000000000Z"))
        .await
        .unwrap()
        .expect("ranged row should exist");
    assert_eq!(payload(&exact), "second");

    drop_table(store, &name).await;
}

pub async fn test_scan_filters_by_id<S: TableStore>(store: &S, prefix: &str) {
    let name = create(store, format!("{}_scan", prefix), false).await;

    store.put_row(&name, row("i=1#s=x", None, "a")).await.unwrap();
    store.put_row(&name, row("i=2#s=x", None, "b")).await.unwrap();
    store.put_row(&name, row("i=2#s=y", None, "c")).await.unwrap();

    assert_eq!(store.scan(&name, &ScanFilter::all()).await.unwrap().len(), 3);

    let filtered = store
        .scan(&name, &ScanFilter::id_contains(["i=2", "s=x"]))
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(payload(&filtered[0]), "b");

    drop_table(store, &name).await;
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all TableStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_table_store_tests {
    ($store:expr, $prefix:expr) => {
        use $crate::storage::table_store_tests::*;

        // lifecycle tests
        test_create_and_exists($store, $prefix).await;
        println!("  test_create_and_exists: PASSED");

        test_create_twice_reports_exists($store, $prefix).await;
        println!("  test_create_twice_reports_exists: PASSED");

        test_delete_missing_table($store, $prefix).await;
        println!("  test_delete_missing_table: PASSED");

        // row tests
        test_put_and_get($store, $prefix).await;
        println!("  test_put_and_get: PASSED");

        test_put_replaces_same_key($store, $prefix).await;
        println!("  test_put_replaces_same_key: PASSED");

        test_query_orders_by_range($store, $prefix).await;
        println!("  test_query_orders_by_range: PASSED");

        test_scan_filters_by_id($store, $prefix).await;
        println!("  test_scan_filters_by_id: PASSED");
    };
}
