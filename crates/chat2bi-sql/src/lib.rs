//! Natural language to SQL translation
//!
//! Turns a question into a prompt, sends it to a completion endpoint,
//! extracts one SQL statement from the free-form answer and checks it
//! against a read-only safety policy. Also hosts the database boundary
//! and the normalizer that makes result rows JSON-safe.

pub mod completion;
pub mod database;
mod error;
pub mod extract;
pub mod normalize;
pub mod prompt;
pub mod translate;
pub mod validate;
mod value;

pub use completion::{CompletionClient, CompletionError, GenerationParams};
pub use database::{Database, DatabaseError, QueryOutput};
pub use error::QueryError;
pub use extract::{ExtractionRules, ExtractorError, SqlExtractor};
pub use normalize::{normalize, normalize_output, normalize_value, JsonRecord};
pub use prompt::PromptAssembler;
pub use translate::{TranslationConfig, TranslationOutcome, Translator};
pub use validate::{is_single_statement, Rejection, SqlValidator, TableMatch};
pub use value::{Record, Value};
