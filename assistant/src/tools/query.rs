//! Query execution against the business database
//!
//! [`QueryRunner`] owns the shared connection and is used two ways: by the
//! model through [`ExecuteQueryTool`], and by the approval path to run an
//! approved proposal outside the workflow.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{clean_schema, Tool};

/// Name of the designated execute-action tool
pub const EXECUTE_QUERY_TOOL: &str = "execute_sql_query";

/// Errors from running a query
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Write operations are disabled. Set allow_writes = true in [database] to enable.")]
    ReadOnly,

    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Query task failed: {0}")]
    Join(String),

    #[error("Database connection lock poisoned")]
    Poisoned,
}

/// Columns and rows of a result set
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Markdown table, optionally truncated to `limit` rows
    pub fn to_markdown(&self, limit: Option<usize>) -> String {
        let header = format!("| {} |", self.columns.join(" | "));
        let separator = format!(
            "| {} |",
            vec!["---"; self.columns.len()].join(" | ")
        );

        let shown = limit.unwrap_or(self.rows.len()).min(self.rows.len());
        let mut lines = vec![header, separator];
        for row in &self.rows[..shown] {
            let cells: Vec<String> = row.iter().map(render_cell).collect();
            lines.push(format!("| {} |", cells.join(" | ")));
        }
        if self.rows.len() > shown {
            lines.push(format!("... ({} more rows)", self.rows.len() - shown));
        }
        lines.join("\n")
    }
}

fn render_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Shared connection to the database the agent queries
pub struct QueryRunner {
    conn: Arc<Mutex<Connection>>,
    allow_writes: bool,
}

impl QueryRunner {
    /// Open the database file
    pub fn open(path: &Path, allow_writes: bool, timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        conn.busy_timeout(timeout)?;
        tracing::info!("Query database opened at {:?} (writes allowed: {})", path, allow_writes);
        Ok(Self::from_connection(conn, allow_writes))
    }

    pub fn from_connection(conn: Connection, allow_writes: bool) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            allow_writes,
        }
    }

    /// Check if a query is a read-only statement
    fn is_read_only_query(query: &str) -> bool {
        let normalized = query.trim().to_uppercase();
        normalized.starts_with("SELECT")
            || normalized.starts_with("EXPLAIN")
            || normalized.starts_with("PRAGMA")
            || normalized.starts_with("WITH")
    }

    /// Execute a query on a blocking thread and collect the full result set
    pub async fn run(&self, query: &str) -> Result<QueryTable, QueryError> {
        if !self.allow_writes && !Self::is_read_only_query(query) {
            return Err(QueryError::ReadOnly);
        }

        let conn = self.conn.clone();
        let query = query.to_string();
        let allow_writes = self.allow_writes;

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| QueryError::Poisoned)?;
            execute(&conn, &query, allow_writes)
        })
        .await
        .map_err(|e| QueryError::Join(e.to_string()))?
    }
}

fn execute(conn: &Connection, query: &str, allow_writes: bool) -> Result<QueryTable, QueryError> {
    let mut stmt = conn.prepare(query)?;

    // Catches writes behind a WITH prefix
    if !allow_writes && !stmt.readonly() {
        return Err(QueryError::ReadOnly);
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    if columns.is_empty() {
        let affected = stmt.execute([])?;
        tracing::info!("Statement executed, {} row(s) affected", affected);
        return Ok(QueryTable::default());
    }

    let rows = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                let value: rusqlite::types::Value = row.get(i)?;
                values.push(match value {
                    rusqlite::types::Value::Null => serde_json::Value::Null,
                    rusqlite::types::Value::Integer(n) => serde_json::json!(n),
                    rusqlite::types::Value::Real(f) => serde_json::json!(f),
                    rusqlite::types::Value::Text(s) => serde_json::Value::String(s),
                    rusqlite::types::Value::Blob(b) => {
                        serde_json::Value::String(format!("<blob {} bytes>", b.len()))
                    }
                });
            }
            Ok(values)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    tracing::info!("Query executed successfully. Rows: {}", rows.len());
    Ok(QueryTable { columns, rows })
}

/// Arguments for the execute-query tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ExecuteQueryArgs {
    /// SQL query to execute against the business database
    pub query: String,
}

/// Execute-action tool: runs a query and renders a truncated table
pub struct ExecuteQueryTool {
    runner: Arc<QueryRunner>,
    max_rows: usize,
}

impl ExecuteQueryTool {
    pub fn new(runner: Arc<QueryRunner>, max_rows: usize) -> Self {
        Self { runner, max_rows }
    }
}

#[async_trait]
impl Tool for ExecuteQueryTool {
    fn name(&self) -> &str {
        EXECUTE_QUERY_TOOL
    }

    fn description(&self) -> &str {
        "Execute a SQL query against the business database. Returns the result as a markdown table or an error message."
    }

    fn parameters(&self) -> serde_json::Value {
        let schema = schemars::schema_for!(ExecuteQueryArgs);
        clean_schema(&serde_json::to_value(schema).unwrap_or_default())
    }

    async fn call(&self, arguments: serde_json::Value) -> Result<String> {
        let args: ExecuteQueryArgs =
            serde_json::from_value(arguments).context("Invalid arguments for execute_sql_query")?;
        tracing::debug!("Query: {}", args.query);

        let table = self
            .runner
            .run(&args.query)
            .await
            .context("Error executing query")?;

        if table.is_empty() {
            return Ok("Query executed successfully per row count: 0".to_string());
        }
        Ok(table.to_markdown(Some(self.max_rows)))
    }
}
