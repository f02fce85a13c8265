//! The observability boundary.
//!
//! Every state transition, tool invocation, and reflection decision is
//! emitted as a structured trace event. The sink itself is an external
//! collaborator; the default forwards to `tracing`.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::state::Route;
use crate::tool::ToolId;

/// A structured event from one point of the turn state machine.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// The state machine moved to a new phase.
    PhaseChanged { phase: String },
    /// The router classified the turn.
    Routed { route: Route, degraded: bool },
    /// The planner produced this cycle's invocations and todo list.
    Planned {
        cycle: u32,
        invocations: usize,
        todo: Vec<String>,
    },
    /// One tool call is being dispatched.
    ToolInvoked { tool: ToolId, input: Value },
    /// One tool call finished.
    ToolCompleted {
        tool: ToolId,
        error: bool,
        output: String,
    },
    /// The reflector decided whether to continue.
    Reflected {
        satisfied: bool,
        forced: bool,
        budget_remaining: u32,
        todo: Vec<String>,
        unresolvable: Vec<String>,
    },
    /// The synthesizer emitted the final answer.
    Synthesized { sources: usize, partial: bool },
    /// The turn was cancelled; un-folded results were discarded.
    Cancelled,
}

/// A trace event with its emission timestamp.
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: TraceEvent,
}

impl TraceRecord {
    pub fn now(event: TraceEvent) -> Self {
        Self {
            at: Utc::now(),
            event,
        }
    }
}

/// Installs a global `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`). Call once at process start; later calls are no-ops.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Destination for trace records. Implementations must not block the loop.
pub trait TraceSink: Send + Sync {
    fn emit(&self, record: TraceRecord);
}

/// Default sink: serializes each record and logs it through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn emit(&self, record: TraceRecord) {
        match serde_json::to_string(&record) {
            Ok(json) => tracing::info!(target: "atelier::trace", "{}", json),
            Err(e) => tracing::warn!(target: "atelier::trace", "unserializable trace event: {}", e),
        }
    }
}

/// Sink that discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn emit(&self, _record: TraceRecord) {}
}

/// Sink that keeps every record in memory, for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    records: Mutex<Vec<TraceRecord>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl TraceSink for RecordingSink {
    fn emit(&self, record: TraceRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}
