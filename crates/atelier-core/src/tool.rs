//! The tool boundary.
//!
//! Tools are a closed set of variants behind one capability interface:
//! the planner selects a `ToolId` tag, never an arbitrary callable. A
//! tool returns either a structured success payload or a structured
//! error payload, never an error that terminates the loop.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// The closed set of callable capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    /// Read-only structured query against the sales database.
    QuerySql,
    /// Document retrieval and local answer synthesis over product sheets.
    SearchDocs,
}

impl ToolId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolId::QuerySql => "query_sql",
            ToolId::SearchDocs => "search_docs",
        }
    }

    /// True for the document-retrieval-and-synthesis capability, whose
    /// outputs carry source citations that the turn accumulates.
    pub fn carries_sources(&self) -> bool {
        matches!(self, ToolId::SearchDocs)
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One planned call: a tool tag plus its structured input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool: ToolId,
    pub input: Value,
}

/// Structured success payload from a tool.
///
/// `sources` is non-empty only for the document tool: the identifiers of
/// the documents actually used to form the answer, not merely retrieved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            content: content.into(),
            sources,
        }
    }
}

/// Structured, non-fatal error payload from a tool.
///
/// The executor folds these into the evidentiary record so the next
/// planning cycle can self-correct; they are never retried automatically
/// and never abort the turn.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The input did not match the tool's schema.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The input was rejected at the boundary (e.g. a non-read query).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The backing store failed or timed out.
    #[error("execution failed: {0}")]
    Execution(String),
}

/// A callable capability exposed to the planner.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The variant tag this tool answers to.
    fn id(&self) -> ToolId;

    /// One-line description surfaced to the planner prompt.
    fn description(&self) -> &str;

    /// Executes the tool against a structured input.
    async fn invoke(&self, input: Value) -> Result<ToolOutput, ToolError>;
}

/// Static catalogue of the capabilities available to the planner.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<ToolId, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.id(), tool);
    }

    pub fn get(&self, id: ToolId) -> Option<Arc<dyn Tool>> {
        self.tools.get(&id).cloned()
    }

    pub fn contains(&self, id: ToolId) -> bool {
        self.tools.contains_key(&id)
    }

    /// Returns (id, description) pairs for the planner prompt.
    pub fn descriptions(&self) -> Vec<(ToolId, String)> {
        let mut entries: Vec<_> = self
            .tools
            .values()
            .map(|tool| (tool.id(), tool.description().to_string()))
            .collect();
        entries.sort_by_key(|(id, _)| id.as_str());
        entries
    }
}
