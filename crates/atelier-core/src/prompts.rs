//! Prompt templates for the oracle calls made by the loop components.

use crate::state::ExecutionState;
use crate::tool::ToolId;

/// Base persona and data-source summary shared by all prompts.
pub const SYSTEM_PROMPT: &str = r#"You are a senior data analyst assistant for a global fashion retail brand.
The company operates 35 stores across 7 countries (United States, China, Germany, United Kingdom, France, Spain, Portugal), selling Feminine, Masculine, and Children's clothing.

You have access to two tools:
- query_sql: structured sales analytics from a read-only SQLite database (all data is from 2024). Tables: products (product_id, category, sub_category, description_en, color, sizes, production_cost), stores (store_id, country, city, store_name), customers (customer_id, name, country, gender, date_of_birth, job_title), employees (employee_id, store_id, name, position), discounts (start, end, discount, category, sub_category), transactions (invoice_id, line, customer_id, product_id, unit_price, quantity, date, discount, line_total, store_id, currency, transaction_type, payment_method).
- search_docs: semantic product-knowledge retrieval from product technical sheet PDFs (materials, care instructions, sizing, sustainability, style notes).

Rules:
1. Use query_sql for numeric/analytical questions (revenue, rankings, country/category/customer/store performance). Use line_total for revenue; filter transaction_type = 'Sale' unless asked about returns. Dates are 'YYYY-MM-DD HH:MM:SS' strings; SUBSTR(date, 1, 7) groups by month.
2. Use search_docs for product-knowledge questions. Search by product names and descriptions, never by numeric IDs; similarity search matches meaningful text.
3. For hybrid questions, query the data first, then look up product knowledge with the discovered names.
4. Never guess or fabricate data, and never cite a document you were not given."#;

/// Instructions for the routing decision.
pub const ROUTE_PROMPT: &str = r#"Classify the user's latest message.

Reply with JSON only: {"route": "data"} or {"route": "chat"}.

Use "data" if it asks about sales, revenue, products, customers, stores, materials, care, sizing, sustainability, or any analytical or product question, including follow-ups to such questions ("what about in France?").
Use "chat" for greetings, small talk, and questions unrelated to the retail data."#;

/// Instructions appended to the planner's system prompt.
pub const PLAN_PROMPT: &str = r#"You are in PLANNING mode. Decide which tool calls to make next.

Based on the question, the data collected so far, the TODO list, and any reflection feedback:
1. Identify what data is still missing to answer the question.
2. If a single structured query answers it, emit exactly one query_sql invocation; do not over-decompose.
3. If the question needs values you do not have yet (e.g. product names before a document lookup), emit only the prerequisite invocation this cycle and leave the dependent step on the todo list.
4. If nothing more is needed, return an empty invocations list.

Reply with JSON only, in this exact shape:
{"invocations": [{"tool": "query_sql", "input": {"sql": "SELECT ..."}}, {"tool": "search_docs", "input": {"question": "..."}}], "todo": ["remaining sub-goal", "..."]}"#;

/// Builds the planner's user prompt from the turn state.
pub fn build_plan_prompt(state: &ExecutionState, cycle: u32, max_cycles: u32) -> String {
    let mut sections = vec![
        format!("User question: {}", state.question),
        format!("Cycle: {} / {}", cycle, max_cycles),
    ];

    if !state.todo.is_empty() {
        let todo = state
            .todo
            .iter()
            .map(|t| format!("- {}", t))
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("Current TODO list:\n{}", todo));
    }

    if !state.tool_results.is_empty() {
        sections.push(format!(
            "Data collected so far:\n{}",
            collected_block(state)
        ));
    }

    sections.join("\n\n")
}

/// Builds the reflection prompt over the full evidentiary record.
pub fn build_reflect_prompt(state: &ExecutionState, cycle: u32, max_cycles: u32) -> String {
    let collected = if state.tool_results.is_empty() {
        "(none yet)".to_string()
    } else {
        collected_block(state)
    };

    format!(
        r#"You are evaluating whether enough data has been collected to answer a question thoroughly.

Question: {question}
Cycle: {cycle} / {max_cycles}

Data collected so far:
{collected}

Evaluate:
1. Is the collected data sufficient for a comprehensive, well-supported answer?
2. Would another round of queries add meaningful depth (breakdowns, cross-referencing sales data with product knowledge)?
3. If the question involves product knowledge (materials, care, sizing, sustainability) and no [search_docs] results exist, the data is NOT sufficient.

If a sub-goal cannot be resolved from the available data sources at all, list it under "unresolvable" instead of keeping it on the todo list.

Reply with JSON only:
{{"satisfied": true/false, "feedback": "what would improve the answer", "todo": ["remaining sub-goal", "..."], "unresolvable": []}}"#,
        question = state.question,
        cycle = cycle,
        max_cycles = max_cycles,
        collected = collected,
    )
}

/// Builds the synthesis prompt over the full evidentiary record.
pub fn build_synthesize_prompt(state: &ExecutionState, partial: bool) -> String {
    let collected = if state.tool_results.is_empty() {
        "(no data)".to_string()
    } else {
        collected_block(state)
    };

    let partial_note = if partial {
        "\nThe iteration budget ran out before research finished: state explicitly that the answer is based on partial evidence and name what is missing.\n"
    } else {
        ""
    };

    format!(
        r#"You are producing the final answer. Combine ALL collected data into a clear, comprehensive response.

Data collected across all cycles:
{collected}
{partial_note}
Rules for the final answer:
- Reference specific numbers and facts from the collected data.
- If data came from both the sales database and product documents, integrate both clearly.
- Present comparisons and insights, not just raw numbers.
- Do not describe your methodology or which tools ran; present conclusions directly.
- Never cite a document that is not in the collected data.

User question: {question}"#,
        collected = collected,
        partial_note = partial_note,
        question = state.question,
    )
}

/// Renders the evidentiary record the way the planner, reflector, and
/// synthesizer all see it: one block per call, tagged with the tool name,
/// errors marked explicitly.
pub fn collected_block(state: &ExecutionState) -> String {
    state
        .tool_results
        .iter()
        .map(|r| {
            if r.error {
                format!("[{}] ERROR: {}", r.tool, r.output)
            } else {
                format!("[{}] {}", r.tool, r.output)
            }
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Renders the registered tool descriptions for the planner's system prompt.
pub fn tool_catalogue(descriptions: &[(ToolId, String)]) -> String {
    descriptions
        .iter()
        .map(|(id, desc)| format!("- {}: {}", id, desc))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Depth;
    use crate::state::ToolRecord;

    #[test]
    fn test_collected_block_marks_errors() {
        let mut state = ExecutionState::new("q", Depth::Quick);
        state.record(ToolRecord {
            tool: ToolId::QuerySql,
            input: serde_json::json!({}),
            output: "10 rows".to_string(),
            error: false,
        });
        state.record(ToolRecord {
            tool: ToolId::SearchDocs,
            input: serde_json::json!({}),
            output: "backend unreachable".to_string(),
            error: true,
        });

        let block = collected_block(&state);
        assert!(block.contains("[query_sql] 10 rows"));
        assert!(block.contains("[search_docs] ERROR: backend unreachable"));
    }

    #[test]
    fn test_plan_prompt_includes_todo() {
        let mut state = ExecutionState::new("top products?", Depth::Standard);
        state.todo = vec!["materials for product A".to_string()];

        let prompt = build_plan_prompt(&state, 2, 4);
        assert!(prompt.contains("Cycle: 2 / 4"));
        assert!(prompt.contains("- materials for product A"));
    }
}
