//! Chat2BI server
//!
//! Accepts natural-language questions over HTTP, turns them into SQL with an
//! OpenAI-compatible model, and answers them from DuckDB.

use anyhow::Context;
use chat2bi_duck::DuckExecutor;
use chat2bi_schema::SchemaMetadata;
use chat2bi_sql::Translator;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

mod api;
mod config;
mod llm;
mod logging;
mod metrics;
mod query;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets (API keys) come from .env
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CHAT2BI_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path))?;

    logging::init(&config.logging);

    let schema = match &config.schema.path {
        Some(path) => SchemaMetadata::load(path).with_context(|| format!("loading schema {}", path))?,
        None => SchemaMetadata::ecommerce()?,
    };
    let schema = Arc::new(schema);
    info!(
        tables = schema.tables.len(),
        database = schema.database.as_deref().unwrap_or("unnamed"),
        "Schema metadata loaded"
    );

    // Initialize on a read-write connection that is closed before serving
    {
        let init = DuckExecutor::open(&config.database.path)
            .with_context(|| format!("opening database {}", config.database.path))?;
        match &config.database.init_script {
            Some(script) if Path::new(script).exists() => init.run_script(script)?,
            Some(script) => warn!(script = %script, "Initialization script not found, skipping"),
            None => {}
        }
    }
    let executor = DuckExecutor::open_read_only(&config.database.path)
        .with_context(|| format!("reopening database {} read-only", config.database.path))?
        .with_max_rows(config.database.max_rows);
    executor.restrict()?;
    let executor = Arc::new(executor);

    let translator = Translator::new(&schema, &config.translation, config.llm.generation)?;
    info!(
        fingerprint = %translator.context().fingerprint(),
        dialect = %config.translation.dialect,
        "Schema context built"
    );

    let api_key = Config::api_key()?;
    let completion = llm::OpenAiCompletionClient::new(&config.llm, api_key);
    info!(
        model = %completion.model(),
        base_url = config.llm.base_url.as_deref().unwrap_or("default"),
        "Completion client configured"
    );

    let service = query::QueryService::new(Arc::new(translator), Arc::new(completion), executor.clone());
    let state = api::AppState {
        service: Arc::new(service),
        schema,
        executor,
        metrics: Arc::new(metrics::Metrics::new()?),
    };
    let app = api::router(state, &config.server.cors_origins);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("Chat2BI server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
