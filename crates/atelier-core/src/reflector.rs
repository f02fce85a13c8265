use std::sync::Arc;

use serde::Deserialize;

use crate::llm::{extract_json, LLM};
use crate::prompts::build_reflect_prompt;
use crate::state::ExecutionState;

/// Judges after each cycle whether the collected evidence suffices, and
/// owns the turn's deterministic termination backstops.
///
/// The reflector is the only component that decrements the iteration
/// budget or sets `satisfied`. The loop therefore terminates even if the
/// oracle never concedes: the budget is spent exactly once per cycle, and
/// cycles that add no evidence force satisfaction independently of the
/// oracle's verdict.
pub struct Reflector {
    llm: Arc<dyn LLM>,
}

/// What one reflection decided, for tracing.
#[derive(Debug, Clone)]
pub struct Reflection {
    pub satisfied: bool,
    /// True when a backstop overrode the oracle (or the oracle failed).
    pub forced: bool,
    pub unresolvable: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReflectDecision {
    satisfied: bool,
    #[serde(default)]
    feedback: String,
    #[serde(default)]
    todo: Vec<String>,
    #[serde(default)]
    unresolvable: Vec<String>,
}

impl Reflector {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self { llm }
    }

    /// Evaluates the cycle whose results start at index `cycle_start` in
    /// `state.tool_results`, updates the TODO list, and spends one unit
    /// of iteration budget.
    pub async fn reflect(
        &self,
        state: &mut ExecutionState,
        cycle_start: usize,
        cycle: u32,
        max_cycles: u32,
    ) -> Reflection {
        let cycle_results = state.results_since(cycle_start);
        let unproductive = cycle_results.is_empty() || cycle_results.iter().all(|r| r.error);

        if unproductive {
            state.unproductive_cycles += 1;
        } else {
            state.unproductive_cycles = 0;
        }

        // Backstops fire before the oracle is consulted. A turn with no
        // successful evidence at all stops on its first dead cycle; a turn
        // that had evidence is allowed one dead cycle before stopping.
        let forced_stop =
            unproductive && (state.unproductive_cycles >= 2 || !state.has_evidence());

        let reflection = if forced_stop {
            tracing::info!(
                unproductive_cycles = state.unproductive_cycles,
                has_evidence = state.has_evidence(),
                "unproductive cycle, forcing satisfaction"
            );
            state.satisfied = true;
            Reflection {
                satisfied: true,
                forced: true,
                unresolvable: Vec::new(),
            }
        } else {
            self.consult_oracle(state, cycle, max_cycles).await
        };

        // The sole budget decrement. Saturating so a zero budget (depth
        // boundary conditions) cannot underflow.
        state.iteration_budget = state.iteration_budget.saturating_sub(1);

        reflection
    }

    async fn consult_oracle(
        &self,
        state: &mut ExecutionState,
        cycle: u32,
        max_cycles: u32,
    ) -> Reflection {
        let prompt = build_reflect_prompt(state, cycle, max_cycles);

        let decision = match self.llm.complete(&prompt).await {
            Ok(response) => parse_reflection(&response),
            Err(e) => {
                tracing::warn!(error = %e, "reflector oracle failed, declaring satisfied");
                None
            }
        };

        match decision {
            Some(decision) => {
                if !decision.feedback.is_empty() {
                    tracing::debug!(feedback = %decision.feedback, "reflection feedback");
                }
                // The new TODO replaces the old wholesale. Sub-goals the
                // oracle deems unanswerable from the available sources are
                // dropped rather than retried forever.
                state.todo = decision
                    .todo
                    .into_iter()
                    .filter(|item| !decision.unresolvable.contains(item))
                    .collect();
                state.satisfied = decision.satisfied;
                Reflection {
                    satisfied: decision.satisfied,
                    forced: false,
                    unresolvable: decision.unresolvable,
                }
            }
            None => {
                state.satisfied = true;
                Reflection {
                    satisfied: true,
                    forced: true,
                    unresolvable: Vec::new(),
                }
            }
        }
    }
}

fn parse_reflection(response: &str) -> Option<ReflectDecision> {
    match serde_json::from_str(extract_json(response)) {
        Ok(decision) => Some(decision),
        Err(e) => {
            tracing::warn!(error = %e, "unparseable reflection, declaring satisfied");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLLM;
    use crate::state::{Depth, ToolRecord};
    use crate::tool::ToolId;

    fn record(error: bool) -> ToolRecord {
        ToolRecord {
            tool: ToolId::QuerySql,
            input: serde_json::json!({"sql": "SELECT 1"}),
            output: if error { "boom".into() } else { "42".into() },
            error,
        }
    }

    #[tokio::test]
    async fn test_budget_spent_exactly_once_per_reflection() {
        let reflector = Reflector::new(Arc::new(ScriptedLLM::always(
            r#"{"satisfied": false, "feedback": "", "todo": ["more"], "unresolvable": []}"#,
        )));
        let mut state = ExecutionState::new("q", Depth::Standard);
        state.record(record(false));

        assert_eq!(state.iteration_budget, 4);
        reflector.reflect(&mut state, 0, 1, 4).await;
        assert_eq!(state.iteration_budget, 3);
        assert!(!state.satisfied);
        assert_eq!(state.todo, vec!["more"]);
    }

    #[tokio::test]
    async fn test_error_only_turn_forces_satisfaction_immediately() {
        // Never consulted; a scripted failure would panic the test if it were.
        let reflector = Reflector::new(Arc::new(ScriptedLLM::failing()));
        let mut state = ExecutionState::new("q", Depth::Quick);
        state.record(record(true));

        let reflection = reflector.reflect(&mut state, 0, 1, 2).await;

        assert!(reflection.satisfied);
        assert!(reflection.forced);
        assert!(state.satisfied);
        assert_eq!(state.unproductive_cycles, 1);
    }

    #[tokio::test]
    async fn test_two_unproductive_cycles_force_satisfaction() {
        let reflector = Reflector::new(Arc::new(ScriptedLLM::always(
            r#"{"satisfied": false, "feedback": "", "todo": [], "unresolvable": []}"#,
        )));
        let mut state = ExecutionState::new("q", Depth::Deep);
        state.record(record(false));

        // Cycle with evidence, then two empty cycles.
        reflector.reflect(&mut state, 0, 1, 6).await;
        assert!(!state.satisfied);

        let r2 = reflector.reflect(&mut state, 1, 2, 6).await;
        assert!(!r2.forced);
        assert_eq!(state.unproductive_cycles, 1);

        let r3 = reflector.reflect(&mut state, 1, 3, 6).await;
        assert!(r3.forced);
        assert!(state.satisfied);
    }

    #[tokio::test]
    async fn test_productive_cycle_resets_counter() {
        let reflector = Reflector::new(Arc::new(ScriptedLLM::always(
            r#"{"satisfied": false, "feedback": "", "todo": [], "unresolvable": []}"#,
        )));
        let mut state = ExecutionState::new("q", Depth::Deep);
        state.record(record(false));
        reflector.reflect(&mut state, 1, 1, 6).await;
        assert_eq!(state.unproductive_cycles, 1);

        state.record(record(false));
        reflector.reflect(&mut state, 1, 2, 6).await;
        assert_eq!(state.unproductive_cycles, 0);
    }

    #[tokio::test]
    async fn test_oracle_failure_declares_satisfied() {
        let reflector = Reflector::new(Arc::new(ScriptedLLM::failing()));
        let mut state = ExecutionState::new("q", Depth::Quick);
        state.record(record(false));

        let reflection = reflector.reflect(&mut state, 0, 1, 2).await;

        assert!(reflection.satisfied);
        assert!(reflection.forced);
        assert!(state.satisfied);
    }

    #[tokio::test]
    async fn test_unresolvable_items_removed_from_todo() {
        let reflector = Reflector::new(Arc::new(ScriptedLLM::always(
            r#"{"satisfied": false, "feedback": "", "todo": ["a", "b"], "unresolvable": ["b"]}"#,
        )));
        let mut state = ExecutionState::new("q", Depth::Standard);
        state.record(record(false));

        let reflection = reflector.reflect(&mut state, 0, 1, 4).await;

        assert_eq!(state.todo, vec!["a"]);
        assert_eq!(reflection.unresolvable, vec!["b"]);
    }
}
