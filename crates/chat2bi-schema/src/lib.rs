//! Schema metadata for the Chat2BI translator
//!
//! Static description of the target database: tables, column labels,
//! join relationships and enumerated values. Loaded once at startup and
//! shared read-only by every request.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

mod context;
pub use context::{build_context, SchemaContext};

/// Metadata for the bundled e-commerce database
const ECOMMERCE_YAML: &str = include_str!("ecommerce.yaml");

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse schema YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Primary key '{primary_key}' of table '{table}' is not one of its columns")]
    PrimaryKeyNotInColumns { table: String, primary_key: String },

    #[error("Table defined more than once: {0}")]
    DuplicateTable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_key: String,
    #[serde(default)]
    pub description: String,
}

/// Directed join edge; `condition` is a literal SQL predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub from: String,
    pub to: String,
    pub condition: String,
}

/// Permitted literal values of a column, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDomain {
    pub column: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    /// Human-readable name of the database, e.g. "e-commerce sales"
    #[serde(default)]
    pub database: Option<String>,

    pub tables: Vec<TableDescriptor>,

    #[serde(default)]
    pub field_labels: BTreeMap<String, String>,

    #[serde(default)]
    pub relationships: Vec<RelationshipEdge>,

    #[serde(default)]
    pub enum_domains: Vec<EnumDomain>,
}

impl SchemaMetadata {
    /// The bundled e-commerce schema (users, categories, products, orders, order_items)
    pub fn ecommerce() -> Result<Self, SchemaError> {
        Self::from_yaml_str(ECOMMERCE_YAML)
    }

    /// Load metadata from a YAML file with the same shape as the bundled one
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, SchemaError> {
        let metadata: SchemaMetadata = serde_yaml::from_str(yaml)?;
        metadata.check()?;
        Ok(metadata)
    }

    /// Enforce the structural invariants of the metadata
    pub fn check(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }
            if !table.columns.iter().any(|c| c == &table.primary_key) {
                return Err(SchemaError::PrimaryKeyNotInColumns {
                    table: table.name.clone(),
                    primary_key: table.primary_key.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Label for a column, falling back to the raw column name
    pub fn label<'a>(&'a self, column: &'a str) -> &'a str {
        self.field_labels
            .get(column)
            .map(String::as_str)
            .unwrap_or(column)
    }

    /// Render the metadata as model-facing context
    pub fn context(&self) -> SchemaContext {
        SchemaContext::new(build_context(self))
    }
}
