use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::llm::{extract_json, LLM};
use crate::prompts::{build_plan_prompt, tool_catalogue, PLAN_PROMPT, SYSTEM_PROMPT};
use crate::state::ExecutionState;
use crate::tool::{ToolId, ToolInvocation, ToolRegistry};

/// Produces the next set of tool invocations and an updated TODO list.
///
/// The planner consumes the turn's outstanding TODO items, the original
/// question, and the evidentiary record so far. An empty invocation list
/// is a valid output and signals the reflector that there is nothing new
/// to evaluate. Oracle failures degrade to an empty plan for the same
/// reason: the deterministic backstops end the loop, not the oracle.
pub struct Planner {
    llm: Arc<dyn LLM>,
}

/// The planner's output for one cycle.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub invocations: Vec<ToolInvocation>,
    pub todo: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PlanDecision {
    #[serde(default)]
    invocations: Vec<RawInvocation>,
    #[serde(default)]
    todo: Vec<String>,
}

/// Lenient wire form: the tool tag arrives as a string so one
/// hallucinated tag doesn't reject the whole plan.
#[derive(Debug, Deserialize)]
struct RawInvocation {
    tool: String,
    #[serde(default)]
    input: Value,
}

impl Planner {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self { llm }
    }

    /// Plans the next cycle. Never fails: any oracle or parse problem
    /// yields an empty plan with the TODO list carried over unchanged.
    pub async fn plan(
        &self,
        state: &ExecutionState,
        registry: &ToolRegistry,
        cycle: u32,
        max_cycles: u32,
    ) -> Plan {
        let system = format!(
            "{}\n\nAvailable tools:\n{}\n\n{}",
            SYSTEM_PROMPT,
            tool_catalogue(&registry.descriptions()),
            PLAN_PROMPT
        );
        let prompt = build_plan_prompt(state, cycle, max_cycles);

        let response = match self.llm.complete_with_system(&system, &prompt).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "planner oracle failed, emitting empty plan");
                return Plan {
                    invocations: Vec::new(),
                    todo: state.todo.clone(),
                };
            }
        };

        match parse_plan(&response, registry) {
            Some(plan) => plan,
            None => {
                tracing::warn!(response = %response, "unparseable plan, emitting empty plan");
                Plan {
                    invocations: Vec::new(),
                    todo: state.todo.clone(),
                }
            }
        }
    }
}

/// Parses the plan JSON, keeping only invocations whose tool tag names a
/// registered variant. Hallucinated tags are dropped, not fatal.
fn parse_plan(response: &str, registry: &ToolRegistry) -> Option<Plan> {
    let decision: PlanDecision = serde_json::from_str(extract_json(response)).ok()?;

    let invocations = decision
        .invocations
        .into_iter()
        .filter_map(|raw| {
            let tool: ToolId = match serde_json::from_value(Value::String(raw.tool.clone())) {
                Ok(tool) => tool,
                Err(_) => {
                    tracing::warn!(tool = %raw.tool, "dropping invocation of unknown tool");
                    return None;
                }
            };
            if !registry.contains(tool) {
                tracing::warn!(tool = %tool, "dropping invocation of unregistered tool");
                return None;
            }
            Some(ToolInvocation {
                tool,
                input: raw.input,
            })
        })
        .collect();

    Some(Plan {
        invocations,
        todo: decision.todo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Tool, ToolError, ToolOutput};
    use async_trait::async_trait;

    struct StubTool(ToolId);

    #[async_trait]
    impl Tool for StubTool {
        fn id(&self) -> ToolId {
            self.0
        }

        fn description(&self) -> &str {
            "stub"
        }

        async fn invoke(&self, _input: Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text("ok"))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(StubTool(ToolId::QuerySql)));
        registry.register(Arc::new(StubTool(ToolId::SearchDocs)));
        registry
    }

    #[test]
    fn test_parse_plan_with_two_invocations() {
        let response = r#"{"invocations": [
            {"tool": "query_sql", "input": {"sql": "SELECT 1"}},
            {"tool": "search_docs", "input": {"question": "silk coat material"}}
        ], "todo": ["check care instructions"]}"#;

        let plan = parse_plan(response, &registry()).unwrap();
        assert_eq!(plan.invocations.len(), 2);
        assert_eq!(plan.invocations[0].tool, ToolId::QuerySql);
        assert_eq!(plan.todo, vec!["check care instructions"]);
    }

    #[test]
    fn test_parse_plan_drops_hallucinated_tool() {
        let response = r#"{"invocations": [
            {"tool": "send_email", "input": {}},
            {"tool": "query_sql", "input": {"sql": "SELECT 1"}}
        ], "todo": []}"#;

        let plan = parse_plan(response, &registry()).unwrap();
        assert_eq!(plan.invocations.len(), 1);
        assert_eq!(plan.invocations[0].tool, ToolId::QuerySql);
    }

    #[test]
    fn test_parse_plan_empty_invocations() {
        let plan = parse_plan(r#"{"invocations": [], "todo": []}"#, &registry()).unwrap();
        assert!(plan.invocations.is_empty());
    }

    #[test]
    fn test_parse_plan_garbage_is_none() {
        assert!(parse_plan("no json here", &registry()).is_none());
    }

    #[tokio::test]
    async fn test_oracle_failure_degrades_to_empty_plan() {
        use crate::llm::ScriptedLLM;
        use crate::state::Depth;

        let planner = Planner::new(Arc::new(ScriptedLLM::failing()));
        let mut state = ExecutionState::new("q", Depth::Quick);
        state.todo = vec!["existing goal".to_string()];

        let plan = planner.plan(&state, &registry(), 1, 2).await;
        assert!(plan.invocations.is_empty());
        assert_eq!(plan.todo, vec!["existing goal"]);
    }
}
