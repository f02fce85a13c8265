//! Scripted LLM for tests and offline runs.
//!
//! The orchestration loop only ever sees text completions, so a queue of
//! canned responses is enough to drive every code path deterministically.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{LLMError, LLM};

/// An LLM that replays a fixed script of responses.
///
/// Each call pops the next response from the queue. When the script is
/// exhausted, the fallback response is returned (or an API error if no
/// fallback was set), which is how tests exercise oracle failure paths.
pub struct ScriptedLLM {
    responses: Mutex<VecDeque<String>>,
    fallback: Option<String>,
}

impl ScriptedLLM {
    /// Creates a mock that replays `responses` in order.
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
            fallback: None,
        }
    }

    /// Creates a mock that always returns the same response.
    pub fn always(response: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Some(response.to_string()),
        }
    }

    /// Creates a mock whose every call fails, for error-path tests.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
        }
    }

    /// Sets the response used once the script runs out.
    pub fn with_fallback(mut self, response: &str) -> Self {
        self.fallback = Some(response.to_string());
        self
    }

    fn next(&self) -> Result<String, LLMError> {
        let mut queue = self.responses.lock().map_err(|_| LLMError::ApiError {
            status: 500,
            message: "scripted responses poisoned".to_string(),
        })?;
        if let Some(response) = queue.pop_front() {
            return Ok(response);
        }
        match &self.fallback {
            Some(response) => Ok(response.clone()),
            None => Err(LLMError::ApiError {
                status: 503,
                message: "scripted responses exhausted".to_string(),
            }),
        }
    }
}

#[async_trait]
impl LLM for ScriptedLLM {
    async fn complete(&self, _prompt: &str) -> Result<String, LLMError> {
        self.next()
    }

    async fn complete_with_system(&self, _system: &str, _prompt: &str) -> Result<String, LLMError> {
        self.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let llm = ScriptedLLM::new(vec!["one", "two"]);
        assert_eq!(llm.complete("x").await.unwrap(), "one");
        assert_eq!(llm.complete("x").await.unwrap(), "two");
        assert!(llm.complete("x").await.is_err());
    }

    #[tokio::test]
    async fn test_fallback_after_script() {
        let llm = ScriptedLLM::new(vec!["one"]).with_fallback("done");
        assert_eq!(llm.complete("x").await.unwrap(), "one");
        assert_eq!(llm.complete("x").await.unwrap(), "done");
        assert_eq!(llm.complete("x").await.unwrap(), "done");
    }
}
