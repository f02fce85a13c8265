use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;

use atelier_core::config::SQL_ROW_CAP;
use atelier_core::tool::{Tool, ToolError, ToolId, ToolOutput};

/// Read-only SQL access to the sales database.
///
/// The guard is syntactic: anything that does not start with SELECT is
/// rejected before touching the connection. Results are rendered as
/// pipe-separated text with a header row, capped at [`SQL_ROW_CAP`] rows
/// so one broad query cannot flood the planner's context.
pub struct SqlTool {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Deserialize)]
struct SqlInput {
    sql: String,
}

impl SqlTool {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, rusqlite::Error> {
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }
}

#[async_trait]
impl Tool for SqlTool {
    fn id(&self) -> ToolId {
        ToolId::QuerySql
    }

    fn description(&self) -> &str {
        "Execute a read-only SQL SELECT query against the fashion retail sales database. \
         Tables: products, stores, customers, employees, discounts, transactions. \
         All data is from 2024. Only SELECT statements are allowed."
    }

    async fn invoke(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let input: SqlInput = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(format!("expected {{\"sql\": ...}}: {}", e)))?;

        let sql = input.sql.trim().to_string();
        if !sql.to_uppercase().starts_with("SELECT") {
            return Err(ToolError::Rejected(
                "only SELECT queries are allowed".to_string(),
            ));
        }

        let conn = self.conn.clone();
        let rendered = tokio::task::spawn_blocking(move || run_query(&conn, &sql))
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))??;

        Ok(ToolOutput::text(rendered))
    }
}

fn run_query(conn: &Mutex<Connection>, sql: &str) -> Result<String, ToolError> {
    let conn = conn
        .lock()
        .map_err(|_| ToolError::Execution("database connection poisoned".to_string()))?;

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ToolError::Execution(e.to_string()))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = stmt
        .query([])
        .map_err(|e| ToolError::Execution(e.to_string()))?;

    let mut rendered: Vec<String> = Vec::new();
    let mut total = 0usize;
    while let Some(row) = rows.next().map_err(|e| ToolError::Execution(e.to_string()))? {
        total += 1;
        if total > SQL_ROW_CAP {
            continue;
        }
        let fields: Vec<String> = (0..columns.len())
            .map(|i| {
                row.get_ref(i)
                    .map(render_field)
                    .unwrap_or_else(|e| e.to_string())
            })
            .collect();
        rendered.push(fields.join(" | "));
    }

    if total == 0 {
        return Ok("Query returned 0 rows.".to_string());
    }

    let header = columns.join(" | ");
    let separator = "-".repeat(header.len());
    let mut lines = vec![header, separator];
    lines.extend(rendered);
    if total > SQL_ROW_CAP {
        lines.push(format!(
            "... ({} total rows, showing first {})",
            total, SQL_ROW_CAP
        ));
    }

    Ok(lines.join("\n"))
}

fn render_field(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SqlTool {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE products (product_id INTEGER, product_name TEXT, unit_price REAL);
             INSERT INTO products VALUES (7021, 'Linen Shirt', 49.9);
             INSERT INTO products VALUES (7022, 'Denim Jacket', 89.0);",
        )
        .unwrap();
        SqlTool::from_connection(conn)
    }

    #[tokio::test]
    async fn test_select_renders_header_and_rows() {
        let tool = fixture();
        let out = tool
            .invoke(serde_json::json!({"sql": "SELECT product_name, unit_price FROM products ORDER BY product_id"}))
            .await
            .unwrap();

        let lines: Vec<&str> = out.content.lines().collect();
        assert_eq!(lines[0], "product_name | unit_price");
        assert!(lines[1].chars().all(|c| c == '-'));
        assert_eq!(lines[2], "Linen Shirt | 49.9");
        assert_eq!(lines[3], "Denim Jacket | 89");
    }

    #[tokio::test]
    async fn test_non_select_rejected() {
        let tool = fixture();
        let err = tool
            .invoke(serde_json::json!({"sql": "DROP TABLE products"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Rejected(_)));
        assert!(err.to_string().contains("only SELECT"));
    }

    #[tokio::test]
    async fn test_select_case_insensitive_guard() {
        let tool = fixture();
        let out = tool
            .invoke(serde_json::json!({"sql": "  select count(*) AS n FROM products"}))
            .await
            .unwrap();
        assert!(out.content.contains("n"));
        assert!(out.content.contains('2'));
    }

    #[tokio::test]
    async fn test_empty_result_set() {
        let tool = fixture();
        let out = tool
            .invoke(serde_json::json!({"sql": "SELECT * FROM products WHERE product_id = 0"}))
            .await
            .unwrap();
        assert_eq!(out.content, "Query returned 0 rows.");
    }

    #[tokio::test]
    async fn test_row_cap_annotation() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (n INTEGER);").unwrap();
        for n in 0..250 {
            conn.execute("INSERT INTO t VALUES (?1)", [n]).unwrap();
        }
        let tool = SqlTool::from_connection(conn);

        let out = tool
            .invoke(serde_json::json!({"sql": "SELECT n FROM t"}))
            .await
            .unwrap();

        assert!(out
            .content
            .ends_with("... (250 total rows, showing first 200)"));
        // header + separator + 200 rows + annotation
        assert_eq!(out.content.lines().count(), 203);
    }

    #[tokio::test]
    async fn test_sql_error_is_execution_error() {
        let tool = fixture();
        let err = tool
            .invoke(serde_json::json!({"sql": "SELECT nope FROM missing"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution(_)));
    }

    #[tokio::test]
    async fn test_malformed_input_rejected() {
        let tool = fixture();
        let err = tool
            .invoke(serde_json::json!({"query": "SELECT 1"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }
}
