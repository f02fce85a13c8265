use std::sync::Arc;

use crate::config::ROUTER_HISTORY_WINDOW;
use crate::error::OrchestratorError;
use crate::llm::LLM;
use crate::message::{transcript, Message};
use crate::prompts::{build_synthesize_prompt, SYSTEM_PROMPT};
use crate::state::ExecutionState;

/// The final answer of a turn together with the documents it cites.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutput {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Produces the user-facing answer from the full evidentiary record.
///
/// Synthesis is the one stage whose oracle failure surfaces to the
/// caller: every earlier stage can degrade to a deterministic fallback,
/// but there is no answer to give without the synthesis completion.
pub struct Synthesizer {
    llm: Arc<dyn LLM>,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self { llm }
    }

    /// Combines everything collected during the turn into one answer.
    ///
    /// `partial` marks a turn whose budget ran out before the reflector
    /// was satisfied; the answer must then say what is missing. A turn
    /// that collected nothing at all falls back to a plain conversational
    /// reply over the history.
    pub async fn synthesize(
        &self,
        state: &ExecutionState,
        history: &[Message],
        partial: bool,
    ) -> Result<TurnOutput, OrchestratorError> {
        if state.tool_results.is_empty() {
            return self.chat_reply(&state.question, history).await;
        }

        let prompt = build_synthesize_prompt(state, partial);
        let answer = self.llm.complete_with_system(SYSTEM_PROMPT, &prompt).await?;

        Ok(TurnOutput {
            answer: render_with_citations(answer, &state.sources),
            sources: citations(state),
        })
    }

    /// Answers a conversational turn directly, no evidence involved.
    pub async fn chat_reply(
        &self,
        question: &str,
        history: &[Message],
    ) -> Result<TurnOutput, OrchestratorError> {
        let prompt = if history.is_empty() {
            question.to_string()
        } else {
            format!(
                "Conversation so far:\n{}\n\nLatest message: {}",
                transcript(history, ROUTER_HISTORY_WINDOW),
                question
            )
        };

        let answer = self.llm.complete_with_system(SYSTEM_PROMPT, &prompt).await?;
        Ok(TurnOutput {
            answer,
            sources: Vec::new(),
        })
    }
}

/// The turn's citation list. A pure projection of the state's source
/// set; calling it twice on the same state yields the same list.
pub fn citations(state: &ExecutionState) -> Vec<String> {
    state.sources.clone()
}

fn render_with_citations(answer: String, sources: &[String]) -> String {
    if sources.is_empty() {
        return answer;
    }
    let listing = sources
        .iter()
        .map(|s| format!("- {}", s))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\nSources:\n{}", answer.trim_end(), listing)
}
