use serde::{Deserialize, Serialize};

/// Speaker of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of conversation history.
///
/// History is read-only input to the core: it is passed into the turn so
/// the router and synthesizer can resolve follow-ups, but persisting it
/// across sessions is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Renders the tail of a conversation as a plain-text transcript for
/// prompts that need prior context (e.g. routing a follow-up question).
pub fn transcript(history: &[Message], max_messages: usize) -> String {
    let start = history.len().saturating_sub(max_messages);
    history[start..]
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            format!("{}: {}", speaker, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_takes_tail() {
        let history = vec![
            Message::user("first"),
            Message::assistant("second"),
            Message::user("third"),
        ];

        let text = transcript(&history, 2);
        assert!(!text.contains("first"));
        assert!(text.contains("assistant: second"));
        assert!(text.contains("user: third"));
    }

    #[test]
    fn test_transcript_shorter_than_limit() {
        let history = vec![Message::user("only")];
        assert_eq!(transcript(&history, 10), "user: only");
    }
}
