use std::sync::Arc;

use serde::Deserialize;

use crate::config::ROUTER_HISTORY_WINDOW;
use crate::llm::{extract_json, LLM};
use crate::message::{transcript, Message};
use crate::prompts::ROUTE_PROMPT;
use crate::state::Route;

/// Classifies an incoming turn as a direct conversational reply or a data
/// question requiring the research loop.
///
/// Routing never blocks a turn: any oracle failure, parse failure, or
/// unknown label degrades to [`Route::Data`] so the question is never
/// silently dropped.
pub struct Router {
    llm: Arc<dyn LLM>,
}

/// Outcome of classification, including whether the decision came from a
/// degraded fallback rather than the oracle.
#[derive(Debug, Clone, Copy)]
pub struct RouteOutcome {
    pub route: Route,
    pub degraded: bool,
}

#[derive(Debug, Deserialize)]
struct RouteDecision {
    route: String,
}

impl Router {
    pub fn new(llm: Arc<dyn LLM>) -> Self {
        Self { llm }
    }

    /// Forced two-valued classification of the current user message.
    ///
    /// The tail of the conversation history is included so follow-ups
    /// ("what about in France?") resolve against the prior data question.
    pub async fn route(&self, question: &str, history: &[Message]) -> RouteOutcome {
        let prompt = if history.is_empty() {
            question.to_string()
        } else {
            format!(
                "Conversation so far:\n{}\n\nLatest message: {}",
                transcript(history, ROUTER_HISTORY_WINDOW),
                question
            )
        };

        match self.llm.complete_with_system(ROUTE_PROMPT, &prompt).await {
            Ok(response) => match parse_route(&response) {
                Some(route) => RouteOutcome {
                    route,
                    degraded: false,
                },
                None => {
                    tracing::warn!(response = %response, "unparseable route decision, defaulting to data");
                    RouteOutcome {
                        route: Route::Data,
                        degraded: true,
                    }
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "router oracle failed, defaulting to data");
                RouteOutcome {
                    route: Route::Data,
                    degraded: true,
                }
            }
        }
    }
}

fn parse_route(response: &str) -> Option<Route> {
    let decision: RouteDecision = serde_json::from_str(extract_json(response)).ok()?;
    match decision.route.as_str() {
        "chat" => Some(Route::Chat),
        "data" => Some(Route::Data),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route_labels() {
        assert_eq!(parse_route(r#"{"route": "chat"}"#), Some(Route::Chat));
        assert_eq!(parse_route(r#"{"route": "data"}"#), Some(Route::Data));
        assert_eq!(parse_route(r#"{"route": "maybe"}"#), None);
        assert_eq!(parse_route("not json"), None);
    }

    #[test]
    fn test_parse_route_fenced() {
        let fenced = "```json\n{\"route\": \"data\"}\n```";
        assert_eq!(parse_route(fenced), Some(Route::Data));
    }
}
