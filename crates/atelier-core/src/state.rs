use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::ToolId;

/// Research depth, chosen once at session start and immutable afterwards.
///
/// Depth maps to the iteration budget of every turn in the session:
/// Quick → 2, Standard → 4, Deep → 6 plan–execute–reflect cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Quick,
    Standard,
    Deep,
}

impl Depth {
    /// Parses a user-facing depth level (1-3).
    pub fn from_level(level: u8) -> Option<Depth> {
        match level {
            1 => Some(Depth::Quick),
            2 => Some(Depth::Standard),
            3 => Some(Depth::Deep),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        match self {
            Depth::Quick => 1,
            Depth::Standard => 2,
            Depth::Deep => 3,
        }
    }

    /// The iteration budget a turn starts with at this depth.
    pub fn iteration_budget(&self) -> u32 {
        self.level() as u32 * 2
    }
}

/// Route classification for a turn, set once by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    /// Direct conversational reply; the loop is bypassed entirely.
    Chat,
    /// Data question; enters the plan-execute-reflect loop.
    Data,
}

/// One entry of the evidentiary record: which tool ran, with what input,
/// and what came back. Errors are recorded, not raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub tool: ToolId,
    pub input: Value,
    pub output: String,
    pub error: bool,
}

/// The mutable record threaded through one research turn.
///
/// Owned exclusively by the turn's orchestrator; the planner and
/// synthesizer read it, the executor appends to it, and the reflector is
/// the only component that touches `iteration_budget` and `satisfied`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionState {
    /// The original user question, immutable for the turn.
    pub question: String,

    /// Route decision, set once per turn.
    pub route: Option<Route>,

    /// Remaining plan-execute-reflect cycles. Decremented only by the
    /// reflector; the loop force-terminates at zero.
    pub iteration_budget: u32,

    /// Append-only, insertion-ordered record of every tool call.
    pub tool_results: Vec<ToolRecord>,

    /// Document identifiers cited so far, unique and order-stable.
    /// Grows monotonically within the turn.
    pub sources: Vec<String>,

    /// Outstanding sub-goals, replaced wholesale by each reflection.
    pub todo: Vec<String>,

    /// Set only by the reflector; true means stop and synthesize.
    pub satisfied: bool,

    /// Consecutive cycles that produced no new evidence (empty or
    /// error-only). The deterministic backstop against unproductive loops.
    pub unproductive_cycles: u32,
}

impl ExecutionState {
    /// Creates the state for a fresh turn at the given depth.
    pub fn new(question: impl Into<String>, depth: Depth) -> Self {
        Self {
            question: question.into(),
            route: None,
            iteration_budget: depth.iteration_budget(),
            tool_results: Vec::new(),
            sources: Vec::new(),
            todo: Vec::new(),
            satisfied: false,
            unproductive_cycles: 0,
        }
    }

    /// Sets the route. The first classification wins; later calls are
    /// ignored because the route never changes within a turn.
    pub fn set_route(&mut self, route: Route) {
        if self.route.is_none() {
            self.route = Some(route);
        }
    }

    /// Appends one tool record to the evidentiary record.
    pub fn record(&mut self, record: ToolRecord) {
        self.tool_results.push(record);
    }

    /// Unions new source identifiers into the turn's citation set,
    /// preserving first-seen order. Sources are never removed.
    pub fn add_sources<I: IntoIterator<Item = String>>(&mut self, sources: I) {
        for source in sources {
            if !self.sources.contains(&source) {
                self.sources.push(source);
            }
        }
    }

    /// True once any successful (non-error) tool output exists.
    pub fn has_evidence(&self) -> bool {
        self.tool_results.iter().any(|r| !r.error)
    }

    /// The records appended since `start`, i.e. the current cycle's
    /// results, given the length of `tool_results` before execution.
    pub fn results_since(&self, start: usize) -> &[ToolRecord] {
        &self.tool_results[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(error: bool) -> ToolRecord {
        ToolRecord {
            tool: ToolId::QuerySql,
            input: serde_json::json!({"sql": "SELECT 1"}),
            output: "1".to_string(),
            error,
        }
    }

    #[test]
    fn test_depth_budget_mapping() {
        assert_eq!(Depth::Quick.iteration_budget(), 2);
        assert_eq!(Depth::Standard.iteration_budget(), 4);
        assert_eq!(Depth::Deep.iteration_budget(), 6);
        assert_eq!(Depth::from_level(4), None);
        assert_eq!(Depth::from_level(3), Some(Depth::Deep));
    }

    #[test]
    fn test_route_set_once() {
        let mut state = ExecutionState::new("q", Depth::Quick);
        state.set_route(Route::Chat);
        state.set_route(Route::Data);
        assert_eq!(state.route, Some(Route::Chat));
    }

    #[test]
    fn test_sources_union_is_order_stable() {
        let mut state = ExecutionState::new("q", Depth::Quick);
        state.add_sources(vec!["7021.pdf".to_string(), "1234.pdf".to_string()]);
        state.add_sources(vec!["1234.pdf".to_string(), "9999.pdf".to_string()]);

        assert_eq!(state.sources, vec!["7021.pdf", "1234.pdf", "9999.pdf"]);
    }

    #[test]
    fn test_evidence_ignores_error_records() {
        let mut state = ExecutionState::new("q", Depth::Quick);
        state.record(record(true));
        assert!(!state.has_evidence());

        state.record(record(false));
        assert!(state.has_evidence());
    }

    #[test]
    fn test_results_since_slices_current_cycle() {
        let mut state = ExecutionState::new("q", Depth::Quick);
        state.record(record(false));
        let start = state.tool_results.len();
        state.record(record(true));
        state.record(record(false));

        assert_eq!(state.results_since(start).len(), 2);
    }
}
