//! Question answering: translate, execute, normalize

use chat2bi_sql::{normalize_output, CompletionClient, Database, JsonRecord, QueryError, Translator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Body of `POST /api/query`
#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

/// Body returned by `POST /api/query`, for success and failure alike
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub question: String,
    pub sql: Option<String>,
    pub data: Option<Vec<JsonRecord>>,
    pub count: Option<usize>,
    pub error: Option<String>,
    /// Seconds, wall clock
    pub execution_time: Option<f64>,
}

impl QueryResponse {
    pub fn new(question: &str, result: &Result<QueryAnswer, QueryError>, elapsed: Duration) -> Self {
        let execution_time = Some(round_millis(elapsed));
        match result {
            Ok(answer) => Self {
                success: true,
                question: question.to_string(),
                sql: Some(answer.sql.clone()),
                count: Some(answer.rows.len()),
                data: Some(answer.rows.clone()),
                error: None,
                execution_time,
            },
            Err(err) => Self {
                success: false,
                question: question.to_string(),
                sql: err.sql().map(str::to_string),
                data: None,
                count: None,
                error: Some(err.to_string()),
                execution_time,
            },
        }
    }
}

fn round_millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub sql: String,
    pub rows: Vec<JsonRecord>,
}

/// Shared by all requests; holds no per-request state
pub struct QueryService {
    translator: Arc<Translator>,
    completion: Arc<dyn CompletionClient>,
    database: Arc<dyn Database>,
}

impl QueryService {
    pub fn new(
        translator: Arc<Translator>,
        completion: Arc<dyn CompletionClient>,
        database: Arc<dyn Database>,
    ) -> Self {
        Self {
            translator,
            completion,
            database,
        }
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Answer one question. Only statements that passed validation reach
    /// the database.
    pub async fn answer(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        let sql = self
            .translator
            .translate(self.completion.as_ref(), question)
            .await
            .into_result()?;

        let database = Arc::clone(&self.database);
        let statement = sql.clone();
        let output = tokio::task::spawn_blocking(move || database.execute(&statement))
            .await
            .map_err(|e| QueryError::System(format!("query task failed: {}", e)))?;

        match output {
            Ok(output) => Ok(QueryAnswer {
                sql,
                rows: normalize_output(output),
            }),
            Err(source) => {
                tracing::warn!(sql = %sql, error = %source, "Query execution failed");
                Err(QueryError::Execution { sql, source })
            }
        }
    }

    /// Answer and time a question, producing the wire response
    pub async fn respond(&self, question: &str) -> (QueryResponse, Result<usize, QueryError>) {
        let started = Instant::now();
        let result = self.answer(question).await;
        let response = QueryResponse::new(question, &result, started.elapsed());
        (response, result.map(|answer| answer.rows.len()))
    }
}
