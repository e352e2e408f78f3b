//! Generated SQL must not reach the filesystem, the network or the
//! engine configuration

use chat2bi_duck::{DuckExecutor, ExecutionError};
use chat2bi_sql::{Database, DatabaseError};
use std::path::{Path, PathBuf};

const SCHEMA_SQL: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/schema.sql");

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("chat2bi_{}_{}", std::process::id(), name))
}

fn remove_db(path: &Path) {
    std::fs::remove_file(path).ok();
    std::fs::remove_file(path.with_extension("duckdb.wal")).ok();
}

/// Sample database on disk, initialized read-write then reopened read-only
fn serving_db(name: &str) -> (DuckExecutor, PathBuf) {
    let path = temp_path(name);
    remove_db(&path);
    {
        let init = DuckExecutor::open(&path).unwrap();
        init.run_script(SCHEMA_SQL).unwrap();
    }
    let executor = DuckExecutor::open_read_only(&path).unwrap();
    executor.restrict().unwrap();
    (executor, path)
}

#[test]
fn test_earlier_statements_never_run() {
    let executor = DuckExecutor::new().unwrap();
    let target = temp_path("copy_target.csv");
    std::fs::remove_file(&target).ok();

    let sql = format!(
        "SELECT 1; COPY (SELECT 42 AS answer) TO '{}' (HEADER)",
        target.display()
    );
    let err = executor.query(&sql).unwrap_err();
    assert!(matches!(err, ExecutionError::MultipleStatements));
    assert!(!target.exists());

    for sql in [
        "SELECT 1; SET threads = 1",
        "SELECT 1; ATTACH ':memory:' AS other",
        "SELECT 1; INSTALL httpfs; LOAD httpfs",
    ] {
        let err = executor.execute(sql).unwrap_err();
        assert!(
            matches!(&err, DatabaseError::Query(msg) if msg.contains("Multiple statements")),
            "{}: {:?}",
            sql,
            err
        );
    }
}

#[test]
fn test_read_only_database_rejects_writes() {
    let (executor, path) = serving_db("read_only.duckdb");

    assert_eq!(executor.query("SELECT * FROM users").unwrap().len(), 5);
    assert!(executor
        .query("INSERT INTO categories (category_id, category_name) VALUES (99, 'x')")
        .is_err());
    assert!(executor.query("CREATE TABLE scratch (id INTEGER)").is_err());
    assert_eq!(
        executor.table_counts(["categories"]).unwrap(),
        [("categories".to_string(), 5)]
    );

    drop(executor);
    remove_db(&path);
}

#[test]
fn test_restricted_database_cannot_read_files() {
    let executor = DuckExecutor::new().unwrap();
    executor.run_script(SCHEMA_SQL).unwrap();

    let sql = format!("SELECT * FROM read_text('{}')", SCHEMA_SQL);
    assert_eq!(executor.query(&sql).unwrap().len(), 1);

    executor.restrict().unwrap();
    assert!(executor.query(&sql).is_err());
    assert!(executor
        .query(&format!("SELECT * FROM read_csv('{}')", SCHEMA_SQL))
        .is_err());
    assert_eq!(executor.query("SELECT * FROM orders").unwrap().len(), 6);
}

#[test]
fn test_restricted_configuration_is_locked() {
    let (executor, path) = serving_db("locked.duckdb");

    assert!(executor.query("SET enable_external_access = true").is_err());
    assert!(executor.query("SET threads = 1").is_err());
    assert!(executor.query("SET lock_configuration = false").is_err());

    drop(executor);
    remove_db(&path);
}
