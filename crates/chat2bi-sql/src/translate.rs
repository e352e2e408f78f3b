//! The translation pipeline: question → prompt → completion → SQL → policy

use chat2bi_schema::{SchemaContext, SchemaMetadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::completion::{CompletionClient, CompletionError, GenerationParams};
use crate::error::QueryError;
use crate::extract::{ExtractionRules, ExtractorError, SqlExtractor};
use crate::prompt::PromptAssembler;
use crate::validate::{SqlValidator, TableMatch};

/// Tunables for prompt wording, extraction and validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// SQL dialect named in the prompt
    pub dialect: String,
    pub table_match: TableMatch,
    pub extraction: ExtractionRules,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            dialect: "DuckDB".to_string(),
            table_match: TableMatch::default(),
            extraction: ExtractionRules::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TranslationOutcome {
    Generated { sql: String },
    GenerationFailed { reason: String },
    ValidationFailed { sql: String, reason: String },
}

impl TranslationOutcome {
    /// Only `Generated` statements may reach the database
    pub fn into_result(self) -> Result<String, QueryError> {
        match self {
            TranslationOutcome::Generated { sql } => Ok(sql),
            TranslationOutcome::GenerationFailed { reason } => Err(QueryError::Generation(reason)),
            TranslationOutcome::ValidationFailed { sql, reason } => {
                Err(QueryError::Validation { sql, reason })
            }
        }
    }
}

/// Stateless translator; one instance is shared by all requests
pub struct Translator {
    context: SchemaContext,
    prompt: PromptAssembler,
    extractor: SqlExtractor,
    validator: SqlValidator,
    params: GenerationParams,
}

impl Translator {
    pub fn new(
        schema: &SchemaMetadata,
        config: &TranslationConfig,
        params: GenerationParams,
    ) -> Result<Self, ExtractorError> {
        Ok(Self {
            context: schema.context(),
            prompt: PromptAssembler::new(config.dialect.clone()),
            extractor: SqlExtractor::new(config.extraction.clone())?,
            validator: SqlValidator::new(schema.table_names(), config.table_match),
            params,
        })
    }

    pub fn context(&self) -> &SchemaContext {
        &self.context
    }

    pub fn prompt_for(&self, question: &str) -> String {
        self.prompt.build(self.context.as_str(), question)
    }

    /// Translate one question; exactly one completion call is made
    pub async fn translate(
        &self,
        client: &dyn CompletionClient,
        question: &str,
    ) -> TranslationOutcome {
        let prompt = self.prompt_for(question);
        debug!(
            prompt_chars = prompt.len(),
            context_fingerprint = %self.context.fingerprint(),
            "Prompt assembled"
        );

        let raw = match client.complete(&prompt, &self.params).await {
            Ok(raw) if raw.trim().is_empty() => {
                warn!("Completion returned blank text");
                return TranslationOutcome::GenerationFailed {
                    reason: CompletionError::Empty.to_string(),
                };
            }
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Completion call failed");
                return TranslationOutcome::GenerationFailed {
                    reason: e.to_string(),
                };
            }
        };
        debug!(raw = %raw, "Completion received");

        let sql = self.extractor.extract(&raw);
        match self.validator.validate(&sql) {
            Ok(()) => {
                info!(sql = %sql, "SQL generated");
                TranslationOutcome::Generated { sql }
            }
            Err(rejection) => {
                warn!(sql = %sql, reason = %rejection, "SQL rejected");
                TranslationOutcome::ValidationFailed {
                    sql,
                    reason: rejection.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_into_result() {
        let ok = TranslationOutcome::Generated { sql: "SELECT 1 FROM users;".to_string() };
        assert_eq!(ok.into_result().unwrap(), "SELECT 1 FROM users;");

        let rejected = TranslationOutcome::ValidationFailed {
            sql: "DROP TABLE users;".to_string(),
            reason: "nope".to_string(),
        };
        match rejected.into_result() {
            Err(QueryError::Validation { sql, reason }) => {
                assert_eq!(sql, "DROP TABLE users;");
                assert_eq!(reason, "nope");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_outcome_serializes_with_tag() {
        let outcome = TranslationOutcome::GenerationFailed { reason: "timeout".to_string() };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "generation_failed");
        assert_eq!(json["reason"], "timeout");
    }

    #[test]
    fn test_prompt_embeds_schema_context() {
        let schema = SchemaMetadata::ecommerce().unwrap();
        let translator =
            Translator::new(&schema, &TranslationConfig::default(), GenerationParams::default())
                .unwrap();

        let prompt = translator.prompt_for("哪个商品最受欢迎？");
        assert!(prompt.contains(translator.context().as_str()));
        assert!(prompt.contains("哪个商品最受欢迎？"));
        assert!(prompt.contains("Use DuckDB syntax"));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: TranslationConfig = serde_json::from_str(r#"{"table_match": "token"}"#).unwrap();
        assert_eq!(config.dialect, "DuckDB");
        assert_eq!(config.table_match, TableMatch::Token);
        assert_eq!(config.extraction, ExtractionRules::default());
    }
}
