//! Lexical safety policy for generated SQL
//!
//! Rules, first failure wins:
//! 1. the statement starts with `SELECT`
//! 2. no mutating/DDL keyword appears as a whole word
//! 3. exactly one statement (a trailing `;` is allowed)
//! 4. at least one known table is referenced
//!
//! This is a guard over tokens and substrings, not a parser: joins, columns
//! and semantics are not checked.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const READ_KEYWORD: &str = "SELECT";

pub const DENYLIST: [&str; 7] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("query must start with a read-query keyword (SELECT)")]
    NotReadQuery,

    #[error("operation {0} is not allowed")]
    ForbiddenKeyword(String),

    #[error("multiple statements are not allowed")]
    MultipleStatements,

    #[error("no valid table name found in query")]
    NoKnownTable,
}

/// How table names are located in the statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMatch {
    /// Case-insensitive substring anywhere in the text
    #[default]
    Substring,
    /// Case-insensitive equality with a whole identifier token
    Token,
}

#[derive(Debug, Clone)]
pub struct SqlValidator {
    known_tables: Vec<String>,
    table_match: TableMatch,
}

impl SqlValidator {
    pub fn new<I, S>(known_tables: I, table_match: TableMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known_tables: known_tables.into_iter().map(Into::into).collect(),
            table_match,
        }
    }

    pub fn validate(&self, sql: &str) -> Result<(), Rejection> {
        if !starts_with_read_keyword(sql) {
            return Err(Rejection::NotReadQuery);
        }

        let words: Vec<&str> = identifier_tokens(sql).collect();
        if let Some(keyword) = DENYLIST
            .iter()
            .find(|kw| words.iter().any(|w| w.eq_ignore_ascii_case(kw)))
        {
            return Err(Rejection::ForbiddenKeyword(keyword.to_string()));
        }

        if !is_single_statement(sql) {
            return Err(Rejection::MultipleStatements);
        }

        let found = match self.table_match {
            TableMatch::Substring => {
                let upper = sql.to_uppercase();
                self.known_tables
                    .iter()
                    .any(|t| upper.contains(&t.to_uppercase()))
            }
            TableMatch::Token => self
                .known_tables
                .iter()
                .any(|t| words.iter().any(|w| w.eq_ignore_ascii_case(t))),
        };
        if !found {
            return Err(Rejection::NoKnownTable);
        }

        Ok(())
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Maximal runs of identifier characters; `.` and quotes act as separators
fn identifier_tokens(sql: &str) -> impl Iterator<Item = &str> {
    sql.split(|c: char| !is_identifier_char(c))
        .filter(|w| !w.is_empty())
}

/// True when no `;` outside quotes and comments is followed by more SQL
pub fn is_single_statement(sql: &str) -> bool {
    let mut chars = sql.chars().peekable();
    let mut terminated = false;

    while let Some(c) = chars.next() {
        if terminated && !c.is_whitespace() && c != ';' {
            return false;
        }
        match c {
            ';' => terminated = true,
            '\'' | '"' => {
                // doubled quotes inside a literal toggle twice and cancel out
                for q in chars.by_ref() {
                    if q == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for n in chars.by_ref() {
                    if n == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for n in chars.by_ref() {
                    if prev == '*' && n == '/' {
                        break;
                    }
                    prev = n;
                }
            }
            _ => {}
        }
    }
    true
}

fn starts_with_read_keyword(sql: &str) -> bool {
    let head = sql.trim_start();
    match head.get(..READ_KEYWORD.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(READ_KEYWORD) => head[READ_KEYWORD.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_identifier_char(c)),
        _ => false,
    }
}
