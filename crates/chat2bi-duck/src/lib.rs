//! DuckDB executor for validated SQL

use chat2bi_sql::{is_single_statement, Database, DatabaseError, QueryOutput, Record, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use duckdb::types::{Decimal as DuckDecimal, TimeUnit, ValueRef};
use duckdb::{AccessMode, Config, Connection};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Days from 0001-01-01 (CE day 1) to the Unix epoch
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("Budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("Multiple statements are not allowed")]
    MultipleStatements,

    #[error("Connection lock poisoned")]
    Poisoned,
}

impl From<ExecutionError> for DatabaseError {
    fn from(e: ExecutionError) -> Self {
        match e {
            ExecutionError::Poisoned => DatabaseError::Connection(e.to_string()),
            other => DatabaseError::Query(other.to_string()),
        }
    }
}

/// Owns the base connection; each query runs on a cloned connection so
/// concurrent requests do not hold the lock while executing.
pub struct DuckExecutor {
    conn: Mutex<Connection>,
    max_rows: Option<usize>,
}

impl DuckExecutor {
    pub fn new() -> Result<Self, ExecutionError> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ExecutionError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self::from_connection(Connection::open(path)?))
    }

    /// Open an existing database file that rejects every write
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Self, ExecutionError> {
        let config = Config::default().access_mode(AccessMode::ReadOnly)?;
        Ok(Self::from_connection(Connection::open_with_flags(path, config)?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            max_rows: None,
        }
    }

    /// Fail queries that return more than `max_rows` rows
    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    fn connection(&self) -> Result<Connection, ExecutionError> {
        let conn = self.conn.lock().map_err(|_| ExecutionError::Poisoned)?;
        Ok(conn.try_clone()?)
    }

    /// Run a batch of statements (schema setup, sample data)
    pub fn execute_batch(&self, sql: &str) -> Result<(), ExecutionError> {
        self.connection()?.execute_batch(sql)?;
        Ok(())
    }

    pub fn run_script<P: AsRef<Path>>(&self, path: P) -> Result<(), ExecutionError> {
        let script = std::fs::read_to_string(&path)?;
        self.execute_batch(&script)?;
        tracing::info!(script = %path.as_ref().display(), "Initialization script applied");
        Ok(())
    }

    /// Disable file and network access for the rest of the process and lock
    /// the configuration so queries cannot turn it back on.
    pub fn restrict(&self) -> Result<(), ExecutionError> {
        self.execute_batch("SET enable_external_access = false; SET lock_configuration = true;")?;
        tracing::info!("External access disabled, configuration locked");
        Ok(())
    }

    /// Row count per table, in the order given
    pub fn table_counts<'a, I>(&self, tables: I) -> Result<Vec<(String, i64)>, ExecutionError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let conn = self.connection()?;
        let mut counts = Vec::new();
        for table in tables {
            let query = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
            let count: i64 = conn.query_row(&query, [], |row| row.get(0))?;
            counts.push((table.to_string(), count));
        }
        Ok(counts)
    }

    /// Execute a query and collect its rows as typed records
    pub fn query(&self, sql: &str) -> Result<Vec<Record>, ExecutionError> {
        // prepare() runs every statement before the last one
        if !is_single_statement(sql) {
            return Err(ExecutionError::MultipleStatements);
        }
        let conn = self.connection()?;
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        let mut columns: Vec<String> = Vec::new();
        let mut records = Vec::new();

        while let Some(row) = rows.next()? {
            // column metadata is only available once the statement has run
            if columns.is_empty() {
                let stmt = row.as_ref();
                for i in 0..stmt.column_count() {
                    columns.push(stmt.column_name(i)?.to_string());
                }
            }

            let mut record = Record::with_capacity(columns.len());
            for (i, name) in columns.iter().enumerate() {
                record.push((name.clone(), value_from_ref(row.get_ref(i)?)));
            }
            records.push(record);

            if let Some(max_rows) = self.max_rows {
                if records.len() > max_rows {
                    return Err(ExecutionError::BudgetExceeded(format!(
                        "Max rows ({}) exceeded",
                        max_rows
                    )));
                }
            }
        }

        tracing::debug!(rows = records.len(), columns = columns.len(), "Query executed");
        Ok(records)
    }
}

impl Database for DuckExecutor {
    fn execute(&self, sql: &str) -> Result<QueryOutput, DatabaseError> {
        Ok(QueryOutput::Rows(self.query(sql)?))
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::Int(i.into()),
        ValueRef::SmallInt(i) => Value::Int(i.into()),
        ValueRef::Int(i) => Value::Int(i.into()),
        ValueRef::BigInt(i) => Value::Int(i),
        // SUM over integers yields HUGEINT
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or(Value::Float(i as f64)),
        ValueRef::UTinyInt(i) => Value::UInt(i.into()),
        ValueRef::USmallInt(i) => Value::UInt(i.into()),
        ValueRef::UInt(i) => Value::UInt(i.into()),
        ValueRef::UBigInt(i) => Value::UInt(i),
        ValueRef::Float(f) => Value::Float(f.into()),
        ValueRef::Double(f) => Value::Float(f),
        ValueRef::Decimal(d) => decimal_value(d),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
        ValueRef::Date32(days) => date_from_days(days).map_or(Value::Null, Value::Date),
        ValueRef::Time64(unit, v) => time_from_midnight(unit, v).map_or(Value::Null, Value::Time),
        ValueRef::Timestamp(unit, v) => {
            timestamp_from_epoch(unit, v).map_or(Value::Null, Value::Timestamp)
        }
        _ => Value::Text("<unsupported>".to_string()),
    }
}

fn decimal_value(d: DuckDecimal) -> Value {
    match rust_decimal::Decimal::try_from_i128_with_scale(d.value(), u32::from(d.scale())) {
        Ok(value) => Value::Decimal(value),
        // wider than 96 bits
        Err(_) => Value::Float(d.value() as f64 / 10f64.powi(i32::from(d.scale()))),
    }
}

/// Whole seconds and leftover nanoseconds of a count of `unit`s
fn split_seconds(unit: TimeUnit, v: i64) -> (i64, u32) {
    let (per_second, nanos_per_unit) = match unit {
        TimeUnit::Second => (1, 0),
        TimeUnit::Millisecond => (1_000, 1_000_000),
        TimeUnit::Microsecond => (1_000_000, 1_000),
        TimeUnit::Nanosecond => (1_000_000_000, 1),
    };
    (
        v.div_euclid(per_second),
        (v.rem_euclid(per_second) * nanos_per_unit) as u32,
    )
}

fn date_from_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

fn time_from_midnight(unit: TimeUnit, v: i64) -> Option<NaiveTime> {
    let (secs, nanos) = split_seconds(unit, v);
    NaiveTime::from_num_seconds_from_midnight_opt(u32::try_from(secs).ok()?, nanos)
}

fn timestamp_from_epoch(unit: TimeUnit, v: i64) -> Option<NaiveDateTime> {
    let (secs, nanos) = split_seconds(unit, v);
    DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}
