use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use atelier_core::config::RETRIEVAL_TOP_K;
use atelier_core::llm::{extract_json, LLM};
use atelier_core::tool::{Tool, ToolError, ToolId, ToolOutput};

use crate::embedder::Embedder;
use crate::store::{Chunk, SqliteChunkStore};

/// Answers product-knowledge questions from embedded technical sheets.
///
/// Retrieval is embed, scan, read: the question is embedded, the top
/// chunks are pulled from the store, and a reading model answers from
/// that context alone. The tool reports which documents the answer
/// actually drew on; citations not present in the retrieved set are
/// discarded so the turn can never cite a document it did not read.
pub struct DocSearchTool {
    embedder: Arc<dyn Embedder>,
    store: Arc<SqliteChunkStore>,
    llm: Arc<dyn LLM>,
}

#[derive(Debug, Deserialize)]
struct DocSearchInput {
    question: String,
}

#[derive(Debug, Deserialize)]
struct ReadingAnswer {
    answer: String,
    #[serde(default)]
    used_sources: Vec<String>,
}

impl DocSearchTool {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<SqliteChunkStore>,
        llm: Arc<dyn LLM>,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
        }
    }

    fn reading_prompt(question: &str, chunks: &[(Chunk, f32)]) -> String {
        let context = chunks
            .iter()
            .map(|(chunk, _)| format!("Source: {}\n{}", chunk.doc_id, chunk.content))
            .collect::<Vec<_>>()
            .join("\n\n---\n\n");

        format!(
            r#"You are a product knowledge assistant. Answer only from the provided context.
If the context is insufficient, say that clearly.
In used_sources, list ONLY the source filenames you actually based your answer on, as basenames like "7021.pdf", never paths.

Reply with JSON only:
{{"answer": "...", "used_sources": ["..."]}}

Question: {question}

Context:
{context}"#,
            question = question,
            context = context,
        )
    }
}

#[async_trait]
impl Tool for DocSearchTool {
    fn id(&self) -> ToolId {
        ToolId::SearchDocs
    }

    fn description(&self) -> &str {
        "Search product technical sheets for product knowledge (materials, care \
         instructions, sizing, sustainability, style notes). Not for sales numbers, \
         revenue, or customer data. Phrase the question with product names or \
         descriptions, not product IDs: semantic search matches text similarity."
    }

    async fn invoke(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let input: DocSearchInput = serde_json::from_value(input).map_err(|e| {
            ToolError::InvalidInput(format!("expected {{\"question\": ...}}: {}", e))
        })?;

        let query = self
            .embedder
            .embed(&input.question)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let store = self.store.clone();
        let hits = tokio::task::spawn_blocking(move || store.top_k(&query, RETRIEVAL_TOP_K))
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        if hits.is_empty() {
            return Ok(ToolOutput::text(
                "No relevant product document context found for this question.",
            ));
        }

        let prompt = Self::reading_prompt(&input.question, &hits);
        let response = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        let (answer, cited) = match serde_json::from_str::<ReadingAnswer>(extract_json(&response))
        {
            Ok(parsed) => (parsed.answer, parsed.used_sources),
            Err(e) => {
                // An unstructured reply is still an answer; it just
                // cannot carry citations we can verify.
                tracing::warn!(error = %e, "unstructured reading answer, dropping citations");
                (response, Vec::new())
            }
        };

        let retrieved: Vec<&str> = hits.iter().map(|(chunk, _)| chunk.doc_id.as_str()).collect();
        let sources: Vec<String> = cited
            .into_iter()
            .filter(|s| retrieved.contains(&s.as_str()))
            .collect();

        Ok(ToolOutput::with_sources(answer, sources))
    }
}
