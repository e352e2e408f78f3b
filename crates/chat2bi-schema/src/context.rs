//! Rendering of schema metadata into language-model context
//!
//! Output follows the metadata's source order, so unchanged metadata always
//! renders to byte-identical text.

use sha2::{Digest, Sha256};
use std::fmt::Write;

use crate::SchemaMetadata;

/// Rendered schema context plus its SHA-256 fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaContext {
    text: String,
    fingerprint: String,
}

impl SchemaContext {
    pub fn new(text: String) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let fingerprint = format!("{:x}", hasher.finalize());
        Self { text, fingerprint }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Describe tables, relationships and enum values as markdown-ish text
pub fn build_context(schema: &SchemaMetadata) -> String {
    let mut ctx = String::new();

    ctx.push_str("### Database Schema Information\n\n");
    match schema.database.as_deref() {
        Some(name) => {
            let _ = writeln!(ctx, "This is the complete structure of the {} database:", name);
        }
        None => ctx.push_str("This is the complete structure of the database:\n"),
    }
    ctx.push_str("\n**Table Structures:**\n");

    for table in &schema.tables {
        if table.description.is_empty() {
            let _ = writeln!(ctx, "\n**{} table**:", table.name);
        } else {
            let _ = writeln!(ctx, "\n**{} table** ({}):", table.name, table.description);
        }
        let _ = writeln!(ctx, "- Primary key: {}", table.primary_key);
        ctx.push_str("- Columns:\n");
        for column in &table.columns {
            let _ = writeln!(ctx, "  - {} ({})", column, schema.label(column));
        }
    }

    ctx.push_str("\n**Table Relationships:**\n");
    for edge in &schema.relationships {
        let _ = writeln!(ctx, "- {} -> {}: {}", edge.from, edge.to, edge.condition);
    }

    ctx.push_str("\n**Enum Values:**\n");
    for domain in &schema.enum_domains {
        let _ = writeln!(ctx, "- {}: {}", domain.column, domain.values.join(", "));
    }

    ctx
}
