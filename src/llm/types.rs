use serde::{Deserialize, Serialize};

use crate::memory::Turn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// System preamble, one user/assistant pair per retained turn, then the new prompt.
    pub fn from_history(system: &str, history: &[Turn], prompt: &str) -> Self {
        let mut messages = Vec::with_capacity(history.len() * 2 + 2);
        messages.push(ChatMessage::system(system));
        for turn in history {
            messages.push(ChatMessage::user(turn.input.clone()));
            messages.push(ChatMessage::assistant(turn.response.clone()));
        }
        messages.push(ChatMessage::user(prompt));
        Self::new(messages)
    }

    pub fn with_temperature(mut self, temperature: Option<f64>) -> Self {
        self.temperature = temperature.or(self.temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens.or(self.max_tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_history_interleaves_turns_before_prompt() {
        let history = vec![
            Turn::new("Where is the KLCC outlet?", "It is in Suria KLCC."),
            Turn::new("Is it open late?", "Until 10pm."),
        ];
        let request = ChatRequest::from_history("sys", &history, "What are its hours?");

        let roles: Vec<&str> = request.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(
            roles,
            vec!["system", "user", "assistant", "user", "assistant", "user"]
        );
        assert_eq!(request.messages[1].content, "Where is the KLCC outlet?");
        assert_eq!(request.messages[4].content, "Until 10pm.");
        assert_eq!(request.messages[5].content, "What are its hours?");
    }

    #[test]
    fn from_history_without_turns() {
        let request = ChatRequest::from_history("sys", &[], "hello");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1], ChatMessage::user("hello"));
    }
}
