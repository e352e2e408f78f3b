//! HTTP API
//!
//! - `GET /` liveness message
//! - `GET /api/info` service name and version
//! - `POST /api/query` natural-language question to result rows
//! - `GET /api/sample-queries` example questions for the frontend
//! - `GET /api/database-info` schema metadata
//! - `GET /api/health` per-table row counts
//! - `GET /metrics` Prometheus exposition

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chat2bi_duck::DuckExecutor;
use chat2bi_schema::SchemaMetadata;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{Instrument, Level};
use uuid::Uuid;

use crate::log_event;
use crate::metrics::{Metrics, Outcome};
use crate::query::{QueryRequest, QueryResponse, QueryService};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<QueryService>,
    pub schema: Arc<SchemaMetadata>,
    pub executor: Arc<DuckExecutor>,
    pub metrics: Arc<Metrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleQuery {
    pub question: &'static str,
    pub description: &'static str,
}

pub const SAMPLE_QUERIES: [SampleQuery; 6] = [
    SampleQuery {
        question: "总销售额是多少？",
        description: "查询所有已完成订单的总销售额",
    },
    SampleQuery {
        question: "查询所有用户的信息",
        description: "获取用户基本信息列表",
    },
    SampleQuery {
        question: "哪个商品最受欢迎？",
        description: "按销量排序找出最受欢迎的商品",
    },
    SampleQuery {
        question: "各个用户等级的人数分布",
        description: "统计不同用户等级的用户数量",
    },
    SampleQuery {
        question: "月度销售趋势",
        description: "按月份统计销售金额",
    },
    SampleQuery {
        question: "库存不足的商品",
        description: "查询库存量低于50的商品",
    },
];

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/info", get(api_info))
        .route("/api/query", post(query))
        .route("/api/sample-queries", get(sample_queries))
        .route("/api/database-info", get(database_info))
        .route("/api/health", get(health))
        .route("/metrics", get(metrics))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({"message": "Chat2BI API is running", "status": "healthy"}))
}

async fn api_info() -> Json<Value> {
    Json(json!({
        "name": "Chat2BI",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Natural language to SQL query API",
    }))
}

/// Always 200; failures are reported in the body
async fn query(State(state): State<AppState>, Json(req): Json<QueryRequest>) -> Json<QueryResponse> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("query", %request_id);

    async move {
        tracing::info!(question = %req.question, "Query received");
        let (response, result) = state.service.respond(&req.question).await;

        let outcome = match &result {
            Ok(_) => Outcome::Succeeded,
            Err(err) => Outcome::from(err),
        };
        let elapsed = std::time::Duration::from_secs_f64(response.execution_time.unwrap_or(0.0));
        state.metrics.record(outcome, elapsed);

        log_event!(
            level: Level::INFO,
            event: "query_completed",
            outcome: outcome.as_str(),
            rows: response.count.unwrap_or(0),
            execution_time: response.execution_time.unwrap_or(0.0)
        );
        Json(response)
    }
    .instrument(span)
    .await
}

async fn sample_queries() -> Json<Value> {
    Json(json!({ "sample_queries": SAMPLE_QUERIES }))
}

async fn database_info(State(state): State<AppState>) -> Json<Value> {
    Json(describe_schema(
        &state.schema,
        state.service.translator().context().fingerprint(),
    ))
}

/// Schema metadata keyed by table, in declaration order
pub fn describe_schema(schema: &SchemaMetadata, fingerprint: &str) -> Value {
    let tables: Map<String, Value> = schema
        .tables
        .iter()
        .map(|t| {
            (
                t.name.clone(),
                json!({
                    "columns": t.columns,
                    "primary_key": t.primary_key,
                    "description": t.description,
                }),
            )
        })
        .collect();

    let mut relationships: Map<String, Value> = Map::new();
    for edge in &schema.relationships {
        let entry = relationships
            .entry(edge.from.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(targets) = entry {
            targets.insert(edge.to.clone(), Value::String(edge.condition.clone()));
        }
    }

    let enum_values: Map<String, Value> = schema
        .enum_domains
        .iter()
        .map(|d| (d.column.clone(), json!(d.values)))
        .collect();

    json!({
        "database": schema.database,
        "tables": tables,
        "field_mapping": schema.field_labels,
        "relationships": relationships,
        "enum_values": enum_values,
        "context_fingerprint": fingerprint,
    })
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let executor = Arc::clone(&state.executor);
    let tables: Vec<String> = state.schema.table_names().map(str::to_string).collect();

    let counts = tokio::task::spawn_blocking(move || {
        executor.table_counts(tables.iter().map(String::as_str))
    })
    .await;

    match counts {
        Ok(Ok(counts)) => {
            let tables: Map<String, Value> = counts
                .into_iter()
                .map(|(table, count)| (table, json!(count)))
                .collect();
            (StatusCode::OK, Json(json!({"status": "healthy", "tables": tables})))
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy", "error": e.to_string()})),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "Health check task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "unhealthy", "error": e.to_string()})),
            )
        }
    }
}

async fn metrics(State(state): State<AppState>) -> (StatusCode, String) {
    match state.metrics.render() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}
