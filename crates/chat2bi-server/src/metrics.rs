//! Prometheus metrics exposed on `/metrics`

use chat2bi_sql::QueryError;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Final state of one `/api/query` request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    GenerationFailed,
    ValidationFailed,
    ExecutionFailed,
    SystemError,
    Succeeded,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::GenerationFailed => "generation_failed",
            Outcome::ValidationFailed => "validation_failed",
            Outcome::ExecutionFailed => "execution_failed",
            Outcome::SystemError => "system_error",
            Outcome::Succeeded => "succeeded",
        }
    }
}

impl From<&QueryError> for Outcome {
    fn from(err: &QueryError) -> Self {
        match err {
            QueryError::Generation(_) => Outcome::GenerationFailed,
            QueryError::Validation { .. } => Outcome::ValidationFailed,
            QueryError::Execution { .. } => Outcome::ExecutionFailed,
            QueryError::System(_) => Outcome::SystemError,
        }
    }
}

pub struct Metrics {
    registry: Registry,
    queries: IntCounterVec,
    latency: Histogram,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let queries = IntCounterVec::new(
            Opts::new("chat2bi_queries_total", "Questions handled, by outcome"),
            &["outcome"],
        )?;
        let latency = Histogram::with_opts(
            HistogramOpts::new(
                "chat2bi_query_duration_seconds",
                "End-to-end latency of /api/query",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;

        registry.register(Box::new(queries.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            queries,
            latency,
        })
    }

    pub fn record(&self, outcome: Outcome, elapsed: Duration) {
        self.queries.with_label_values(&[outcome.as_str()]).inc();
        self.latency.observe(elapsed.as_secs_f64());
    }

    /// Text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
