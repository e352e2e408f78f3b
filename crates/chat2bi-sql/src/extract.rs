//! Extraction of a single SQL statement from free-form model output
//!
//! Line-oriented heuristics, not a SQL grammar:
//! 1. fenced code blocks, inline or multi-line, are unwrapped and prose
//!    around them is dropped
//! 2. lines starting with a clause keyword open the statement
//! 3. once open, following lines are kept unless they are a preamble
//! 4. without any keyword line the whole text is used
//! 5. whitespace is collapsed and a `;` terminator appended

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TERMINATOR: char = ';';

#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("Invalid extraction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Predicate sets driving line retention
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    /// A line starting with one of these (case-insensitive) opens the statement
    pub clause_keywords: Vec<String>,

    /// Conversational lead-ins never kept as continuation lines
    pub preamble_prefixes: Vec<String>,

    /// Language tags recognized right after a fence marker
    pub fence_tags: Vec<String>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            clause_keywords: owned(&[
                "SELECT", "FROM", "WHERE", "JOIN", "GROUP BY", "ORDER BY", "LIMIT", "HAVING",
            ]),
            preamble_prefixes: owned(&["here is", "here's", "answer:"]),
            fence_tags: owned(&["sql", "mysql", "duckdb", "postgresql", "postgres", "sqlite"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqlExtractor {
    keywords: Vec<String>,
    preambles: Vec<String>,
    tags: Vec<String>,
    fenced_block: Regex,
    fence_header: Regex,
    fence_line: Regex,
    fence_marker: Regex,
}

impl SqlExtractor {
    pub fn new(rules: ExtractionRules) -> Result<Self, ExtractorError> {
        let mut tags: Vec<String> = rules.fence_tags.iter().map(|t| regex::escape(t)).collect();
        // longest first so `sqlite` is not cut down to `sql`
        tags.sort_by(|a, b| b.len().cmp(&a.len()));

        let fence_marker = if tags.is_empty() {
            Regex::new(r"`{3,}")?
        } else {
            Regex::new(&format!(r"(?i)`{{3,}}(?:(?:{})\b)?", tags.join("|")))?
        };

        Ok(Self {
            keywords: rules.clause_keywords.iter().map(|k| k.to_uppercase()).collect(),
            preambles: rules.preamble_prefixes.iter().map(|p| p.to_lowercase()).collect(),
            tags: rules.fence_tags.iter().map(|t| t.to_lowercase()).collect(),
            fenced_block: Regex::new(r"(?s)`{3,}(.*?)`{3,}")?,
            fence_header: Regex::new(r"^[ \t]*[A-Za-z0-9_+.-]*[ \t]*$")?,
            fence_line: Regex::new(r"(?m)^[ \t]*`{3,}[ \t]*[A-Za-z0-9_+.-]*[ \t]*$")?,
            fence_marker,
        })
    }

    /// Reduce raw completion text to one single-line, `;`-terminated statement
    pub fn extract(&self, raw: &str) -> String {
        let text = self.strip_fences(raw);

        let mut retained: Vec<&str> = Vec::new();
        for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if self.opens_statement(line) || (!retained.is_empty() && !self.is_preamble(line)) {
                retained.push(line);
            }
        }

        let joined = if retained.is_empty() {
            text.trim().to_string()
        } else {
            retained.join(" ")
        };

        let mut sql = joined.split_whitespace().collect::<Vec<_>>().join(" ");
        if !sql.ends_with(TERMINATOR) {
            sql.push(TERMINATOR);
        }
        sql
    }

    fn strip_fences(&self, raw: &str) -> String {
        let blocks: Vec<&str> = self
            .fenced_block
            .captures_iter(raw)
            .filter_map(|c| c.get(1))
            .map(|m| self.block_body(m.as_str()))
            .collect();

        let text = if blocks.is_empty() {
            raw.to_string()
        } else {
            blocks.join("\n")
        };

        let text = self.fence_line.replace_all(&text, "");
        self.fence_marker.replace_all(&text, "").into_owned()
    }

    /// Drop the language header of a fenced block: a lone first line in
    /// multi-line blocks, a known tag word in inline ones
    fn block_body<'a>(&self, inner: &'a str) -> &'a str {
        if let Some((first, rest)) = inner.split_once('\n') {
            if self.fence_header.is_match(first) && !self.opens_statement(first.trim()) {
                return rest;
            }
        }

        let trimmed = inner.trim_start();
        let word_end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let word = &trimmed[..word_end];
        if !word.is_empty() && self.tags.iter().any(|t| t.eq_ignore_ascii_case(word)) {
            &trimmed[word_end..]
        } else {
            inner
        }
    }

    fn opens_statement(&self, line: &str) -> bool {
        let upper = line.to_uppercase();
        self.keywords.iter().any(|k| upper.starts_with(k.as_str()))
    }

    fn is_preamble(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.preambles.iter().any(|p| lower.starts_with(p.as_str()))
    }
}
