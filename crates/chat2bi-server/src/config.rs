//! Configuration system for the Chat2BI server
//!
//! Loads configuration from:
//! 1. config.yaml - operational settings (port, database, model, logging)
//! 2. .env file - secrets (API keys)
//!
//! Environment variables always override config.yaml values.

use chat2bi_sql::{GenerationParams, TranslationConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

/// DuckDB database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,

    /// SQL script applied at startup (schema and sample data)
    pub init_script: Option<String>,

    /// Queries returning more rows than this fail
    pub max_rows: Option<usize>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/ecommerce.duckdb".to_string(),
            init_script: Some("data/schema.sql".to_string()),
            max_rows: Some(10_000),
        }
    }
}

/// OpenAI-compatible completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,

    /// API base URL; `None` uses the OpenAI default
    pub base_url: Option<String>,

    #[serde(flatten)]
    pub generation: GenerationParams,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "llama3-8b-8192".to_string(),
            base_url: Some("https://api.groq.com/openai/v1".to_string()),
            generation: GenerationParams::default(),
        }
    }
}

/// Schema metadata source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// YAML metadata file; `None` uses the bundled e-commerce schema
    pub path: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or module-specific
    pub level: String,

    /// Output format: pretty, json, compact
    pub format: String,

    /// Output destination: stdout, file, both
    pub output: String,

    /// Directory for log files
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            output: "stdout".to_string(),
            directory: "./logs".to_string(),
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub translation: TranslationConfig,
    pub schema: SchemaConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from YAML file with environment variable overrides
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load `path` when it exists, otherwise start from defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            return Self::load(path);
        }
        let mut config = Config::default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CHAT2BI_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CHAT2BI_SERVER_PORT") {
            if let Ok(port_num) = port.parse() {
                self.server.port = port_num;
            }
        }

        if let Ok(path) = std::env::var("CHAT2BI_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Ok(model) = std::env::var("CHAT2BI_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Ok(url) = std::env::var("CHAT2BI_LLM_BASE_URL") {
            self.llm.base_url = Some(url);
        }
        if let Ok(path) = std::env::var("CHAT2BI_SCHEMA_PATH") {
            self.schema.path = Some(path);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(output) = std::env::var("LOG_OUTPUT") {
            self.logging.output = output;
        }
        if let Ok(dir) = std::env::var("LOG_DIR") {
            self.logging.directory = dir;
        }
    }

    /// Completion API key from the environment (usually via .env)
    pub fn api_key() -> Result<String, ConfigError> {
        std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("GROQ_API_KEY"))
            .map_err(|_| ConfigError::MissingEnvVar("LLM_API_KEY or GROQ_API_KEY".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat2bi_sql::TableMatch;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.path, "data/ecommerce.duckdb");
        assert_eq!(config.llm.model, "llama3-8b-8192");
        assert_eq!(config.llm.generation.max_tokens, 500);
        assert_eq!(config.translation.dialect, "DuckDB");
        assert_eq!(config.translation.table_match, TableMatch::Substring);
        assert!(config.schema.path.is_none());
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.output, "stdout");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
server:
  port: 9000
llm:
  model: "llama-3.1-8b-instant"
  temperature: 0.0
translation:
  table_match: token
  extraction:
    preamble_prefixes: ["here is", "answer:", "note:"]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
        assert_eq!(config.llm.generation.temperature, 0.0);
        assert_eq!(config.llm.generation.top_p, 0.9);
        assert_eq!(config.translation.table_match, TableMatch::Token);
        assert_eq!(config.translation.extraction.preamble_prefixes.len(), 3);
        assert_eq!(config.translation.extraction.clause_keywords.len(), 8);
        assert_eq!(config.database.init_script.as_deref(), Some("data/schema.sql"));
    }

    #[test]
    fn test_env_var_override() {
        std::env::set_var("CHAT2BI_SERVER_PORT", "9090");
        std::env::set_var("CHAT2BI_LLM_MODEL", "mixtral-8x7b-32768");

        let config_yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
llm:
  model: "llama3-8b-8192"
"#;
        let temp_file = std::env::temp_dir().join("chat2bi_test_config.yaml");
        std::fs::write(&temp_file, config_yaml).unwrap();

        let config = Config::load(&temp_file).unwrap();
        assert_eq!(config.server.port, 9090); // Overridden
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.llm.model, "mixtral-8x7b-32768"); // Overridden

        std::env::remove_var("CHAT2BI_SERVER_PORT");
        std::env::remove_var("CHAT2BI_LLM_MODEL");
        std::fs::remove_file(temp_file).ok();
    }

    #[test]
    fn test_shipped_config_parses() {
        let config: Config = serde_yaml::from_str(include_str!("../../../config.yaml")).unwrap();
        assert_eq!(config.server.cors_origins, ["http://localhost:3000"]);
        assert_eq!(config.database.init_script.as_deref(), Some("data/schema.sql"));
        assert!(config.schema.path.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_or_default("/nonexistent/chat2bi/config.yaml").unwrap();
        assert_eq!(config.database.max_rows, Some(10_000));
    }
}
