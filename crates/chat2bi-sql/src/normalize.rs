//! Conversion of database values into JSON-safe rows
//!
//! Calendar values become ISO-8601 strings, decimals become `f64`.
//! Everything else is already representable and passes through.

use rust_decimal::prelude::ToPrimitive;
use serde_json::{Map, Number};

use crate::database::QueryOutput;
use crate::value::{Record, Value};

/// Column name used when the database returns a bare scalar
pub const SCALAR_FIELD: &str = "result";

pub type JsonRecord = Map<String, serde_json::Value>;

pub fn normalize_value(value: Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(b),
        Value::Int(i) => serde_json::Value::from(i),
        Value::UInt(u) => serde_json::Value::from(u),
        Value::Float(f) => float_to_json(f),
        Value::Decimal(d) => d.to_f64().map_or(serde_json::Value::Null, float_to_json),
        Value::Text(s) => serde_json::Value::String(s),
        Value::Blob(b) => serde_json::Value::String(format!("<blob {} bytes>", b.len())),
        Value::Date(d) => serde_json::Value::String(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => serde_json::Value::String(t.format("%H:%M:%S%.f").to_string()),
        Value::Timestamp(ts) => {
            serde_json::Value::String(ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }
        Value::Json(v) => v,
    }
}

// NaN and infinities have no JSON form
fn float_to_json(f: f64) -> serde_json::Value {
    Number::from_f64(f).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

pub fn normalize_record(record: Record) -> JsonRecord {
    record
        .into_iter()
        .map(|(column, value)| (column, normalize_value(value)))
        .collect()
}

pub fn normalize(rows: Vec<Record>) -> Vec<JsonRecord> {
    rows.into_iter().map(normalize_record).collect()
}

/// Normalize rows, wrapping a bare scalar as `[{"result": value}]`
pub fn normalize_output(output: QueryOutput) -> Vec<JsonRecord> {
    match output {
        QueryOutput::Rows(rows) => normalize(rows),
        QueryOutput::Scalar(value) => {
            let mut record = JsonRecord::new();
            record.insert(SCALAR_FIELD.to_string(), normalize_value(value));
            vec![record]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;
    use serde_json::json;

    fn sample_row() -> Record {
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        vec![
            ("order_id".to_string(), Value::Int(42)),
            ("username".to_string(), Value::from("alice")),
            ("is_active".to_string(), Value::Bool(true)),
            ("order_date".to_string(), Value::Date(date)),
            (
                "created_at".to_string(),
                Value::Timestamp(date.and_hms_opt(10, 30, 5).unwrap()),
            ),
            ("final_amount".to_string(), Value::Decimal(Decimal::new(129_950, 2))),
            ("discount".to_string(), Value::Null),
        ]
    }

    #[test]
    fn test_normalize_converts_calendar_and_decimal() {
        let rows = normalize(vec![sample_row()]);
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row["order_id"], json!(42));
        assert_eq!(row["username"], json!("alice"));
        assert_eq!(row["is_active"], json!(true));
        assert_eq!(row["order_date"], json!("2024-03-15"));
        assert_eq!(row["created_at"], json!("2024-03-15T10:30:05"));
        assert_eq!(row["final_amount"], json!(1299.5));
        assert_eq!(row["discount"], serde_json::Value::Null);
    }

    #[test]
    fn test_column_order_preserved() {
        let rows = normalize(vec![sample_row()]);
        let columns: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(
            columns,
            vec!["order_id", "username", "is_active", "order_date", "created_at", "final_amount", "discount"]
        );
    }

    #[test]
    fn test_time_and_fractional_timestamp() {
        let t = NaiveTime::from_hms_milli_opt(8, 5, 9, 250).unwrap();
        assert_eq!(normalize_value(Value::Time(t)), json!("08:05:09.250"));

        let ts = NaiveDate::from_ymd_opt(2023, 12, 31)
            .unwrap()
            .and_hms_micro_opt(23, 59, 59, 1)
            .unwrap();
        assert_eq!(
            normalize_value(Value::Timestamp(ts)),
            json!("2023-12-31T23:59:59.000001")
        );
    }

    #[test]
    fn test_non_finite_float_becomes_null() {
        assert_eq!(normalize_value(Value::Float(f64::NAN)), serde_json::Value::Null);
        assert_eq!(normalize_value(Value::Float(2.5)), json!(2.5));
    }

    #[test]
    fn test_scalar_output_wrapped() {
        let rows = normalize_output(QueryOutput::Scalar(Value::Int(7)));
        assert_eq!(rows.len(), 1);
        assert_eq!(serde_json::Value::Object(rows[0].clone()), json!({"result": 7}));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize(vec![sample_row()]);
        let again = normalize(
            once.iter()
                .map(|row| {
                    row.iter()
                        .map(|(k, v)| (k.clone(), Value::from(v.clone())))
                        .collect()
                })
                .collect(),
        );
        assert_eq!(once, again);
    }

    #[test]
    fn test_blob_rendered_as_placeholder() {
        assert_eq!(
            normalize_value(Value::Blob(vec![1, 2, 3])),
            json!("<blob 3 bytes>")
        );
    }
}
