use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::json;

use atelier_core::llm::ScriptedLLM;
use atelier_core::tool::Tool;
use atelier_tools::embedder::{EmbedError, Embedder};
use atelier_tools::{DocSearchTool, SqlTool, SqliteChunkStore};

struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    // Two axes: "linen" and "denim". Enough to steer retrieval in tests.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let lower = text.to_lowercase();
        Ok(vec![
            if lower.contains("linen") { 1.0 } else { 0.0 },
            if lower.contains("denim") { 1.0 } else { 0.0 },
        ])
    }
}

fn sales_fixture(path: &std::path::Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE transactions (
            invoice_id TEXT, product_id INTEGER, quantity INTEGER,
            line_total REAL, transaction_type TEXT, date TEXT
        );
        INSERT INTO transactions VALUES ('INV-1', 7021, 3, 149.7, 'Sale', '2024-03-02');
        INSERT INTO transactions VALUES ('INV-2', 7021, 1, 49.9, 'Sale', '2024-03-05');
        INSERT INTO transactions VALUES ('INV-3', 7021, 1, -49.9, 'Return', '2024-03-09');",
    )
    .unwrap();
}

#[tokio::test]
async fn test_sql_tool_against_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sales.db");
    sales_fixture(&db_path);

    let tool = SqlTool::open(&db_path).unwrap();
    let out = tool
        .invoke(json!({
            "sql": "SELECT SUM(quantity) AS units FROM transactions WHERE transaction_type = 'Sale'"
        }))
        .await
        .unwrap();

    assert!(out.content.starts_with("units"));
    assert!(out.content.ends_with('4'));
}

#[tokio::test]
async fn test_doc_search_over_seeded_store() {
    let embedder = Arc::new(KeywordEmbedder);
    let store = SqliteChunkStore::open_in_memory().unwrap();
    store
        .insert(
            "7021.pdf",
            "Linen Shirt technical sheet. Composition: 55% linen, 45% cotton. Machine wash cold.",
            &embedder.embed("linen shirt").await.unwrap(),
        )
        .unwrap();
    store
        .insert(
            "7022.pdf",
            "Denim Jacket technical sheet. Composition: 100% cotton denim. Wash inside out.",
            &embedder.embed("denim jacket").await.unwrap(),
        )
        .unwrap();

    let tool = DocSearchTool::new(
        embedder,
        Arc::new(store),
        Arc::new(ScriptedLLM::always(
            r#"{"answer": "Machine wash cold.", "used_sources": ["7021.pdf"]}"#,
        )),
    );

    let out = tool
        .invoke(json!({"question": "how do I care for the linen shirt?"}))
        .await
        .unwrap();

    assert_eq!(out.content, "Machine wash cold.");
    assert_eq!(out.sources, vec!["7021.pdf"]);
}
