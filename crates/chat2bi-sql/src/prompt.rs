//! Prompt assembly for SQL generation

/// Builds the single user message sent to the completion endpoint.
///
/// The rules are only stated to the model; enforcement happens in
/// [`crate::SqlExtractor`] and [`crate::SqlValidator`].
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    dialect: String,
}

impl PromptAssembler {
    pub fn new(dialect: impl Into<String>) -> Self {
        Self {
            dialect: dialect.into(),
        }
    }

    pub fn build(&self, context: &str, question: &str) -> String {
        format!(
            r#"
You are a professional SQL query generation expert. Please generate accurate {dialect} queries based on user's natural language questions.

{context}

### Important Rules:
1. Return ONLY the SQL query statement, nothing else
2. Do NOT include any explanations, descriptions, or comments
3. Use {dialect} syntax
4. Field names and table names must exactly match the database structure
5. Use appropriate JOINs to connect tables
6. For time queries, use appropriate DATE functions
7. For fuzzy queries, use LIKE operator
8. For statistical queries, use COUNT, SUM, AVG and other aggregate functions
9. For sorting queries, use ORDER BY
10. For pagination queries, use LIMIT

### Example:
Question: How many users are there?
Answer: SELECT COUNT(*) FROM users;

### User Question:
{question}

### SQL Query (return only the SQL statement):
"#,
            dialect = self.dialect,
            context = context,
            question = question,
        )
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new("DuckDB")
    }
}
