mod claude;
mod error;
mod mock;
mod openai;
mod provider;

pub use claude::ClaudeClient;
pub use error::LLMError;
pub use mock::ScriptedLLM;
pub use openai::OpenAIClient;
pub use provider::Provider;

use async_trait::async_trait;

/// Trait for Large Language Model providers.
///
/// The loop treats the model as a non-deterministic oracle behind this
/// narrow interface: it asks for a completion and parses the result into
/// one of a fixed set of structured decisions. Loop termination never
/// depends on the oracle behaving (see `Reflector`).
#[async_trait]
pub trait LLM: Send + Sync {
    /// Complete a prompt and return the response.
    async fn complete(&self, prompt: &str) -> Result<String, LLMError>;

    /// Complete a prompt with a system message.
    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError>;
}

/// Blanket implementation for boxed trait objects.
#[async_trait]
impl LLM for Box<dyn LLM> {
    async fn complete(&self, prompt: &str) -> Result<String, LLMError> {
        (**self).complete(prompt).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> Result<String, LLMError> {
        (**self).complete_with_system(system, prompt).await
    }
}

/// Extracts JSON from a response that might be wrapped in markdown code blocks.
///
/// Models regularly fence structured output as ```json ... ``` even when
/// told not to; strip the fence before handing the text to serde.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        if let Some(start) = trimmed.find('\n') {
            let rest = &trimmed[start + 1..];
            if let Some(end) = rest.rfind("```") {
                return rest[..end].trim();
            }
        }
    }

    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_plain() {
        assert_eq!(extract_json(r#"{"a": 1}"#), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_fenced() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(extract_json(fenced), r#"{"a": 1}"#);
    }

    #[test]
    fn test_extract_json_fenced_no_language() {
        let fenced = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(fenced), r#"{"a": 1}"#);
    }
}
