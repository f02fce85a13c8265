use thiserror::Error;

use crate::llm::LLMError;

/// Failures that abort a turn. Tool errors never surface here; they are
/// folded into the turn state as error-marked records.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("turn cancelled")]
    Cancelled,

    #[error("answer synthesis failed: {0}")]
    SynthesisFailed(#[from] LLMError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(OrchestratorError::Cancelled.to_string(), "turn cancelled");

        let err = OrchestratorError::SynthesisFailed(LLMError::RateLimited);
        assert!(err.to_string().starts_with("answer synthesis failed"));
    }
}
