//! Executes queries against the bundled e-commerce sample database

use chat2bi_duck::DuckExecutor;
use chat2bi_schema::SchemaMetadata;
use chat2bi_sql::{normalize_output, Database, Value};
use serde_json::json;

const SCHEMA_SQL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/schema.sql");

fn sample_db() -> DuckExecutor {
    let executor = DuckExecutor::new().unwrap();
    executor.run_script(SCHEMA_SQL).unwrap();
    executor
}

#[test]
fn test_init_script_matches_metadata() {
    let executor = sample_db();
    let schema = SchemaMetadata::ecommerce().unwrap();

    for table in &schema.tables {
        let rows = executor
            .query(&format!(
                "SELECT column_name FROM information_schema.columns \
                 WHERE table_name = '{}' ORDER BY ordinal_position",
                table.name
            ))
            .unwrap();
        let columns: Vec<String> = rows
            .into_iter()
            .map(|mut r| match r.remove(0).1 {
                Value::Text(s) => s,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(columns, table.columns, "columns of {}", table.name);
    }
}

#[test]
fn test_init_script_is_rerunnable() {
    let executor = sample_db();
    executor.run_script(SCHEMA_SQL).unwrap();

    let counts = executor
        .table_counts(["users", "categories", "products", "orders", "order_items"])
        .unwrap();
    assert_eq!(
        counts,
        vec![
            ("users".to_string(), 5),
            ("categories".to_string(), 5),
            ("products".to_string(), 5),
            ("orders".to_string(), 6),
            ("order_items".to_string(), 7),
        ]
    );
}

#[test]
fn test_typed_values_normalize_to_json() {
    let executor = sample_db();

    let output = executor
        .execute(
            "SELECT order_id, order_date, final_amount, payment_method, created_at \
             FROM orders WHERE order_id = 2;",
        )
        .unwrap();
    let rows = normalize_output(output);

    assert_eq!(
        serde_json::Value::Object(rows[0].clone()),
        json!({
            "order_id": 2,
            "order_date": "2024-01-18",
            "final_amount": 9398.0,
            "payment_method": "Credit Card",
            "created_at": "2024-01-18T15:05:00",
        })
    );
}

#[test]
fn test_aggregates_and_booleans() {
    let executor = sample_db();

    let rows = normalize_output(
        executor
            .execute(
                "SELECT SUM(final_amount) AS total, COUNT(*) AS n, SUM(quantity) AS items \
                 FROM orders JOIN order_items ON orders.order_id = order_items.order_id \
                 WHERE order_status = 'Delivered';",
            )
            .unwrap(),
    );
    assert_eq!(rows[0]["n"], json!(3));
    assert_eq!(rows[0]["items"], json!(3));
    // order 2 has two items, so its final amount is counted twice
    assert_eq!(rows[0]["total"], json!(24595.0));

    let rows = normalize_output(
        executor
            .execute("SELECT product_name, is_active FROM products WHERE is_active = false;")
            .unwrap(),
    );
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["product_name"], json!("Ultraboost"));
    assert_eq!(rows[0]["is_active"], json!(false));
}
