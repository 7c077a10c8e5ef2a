//! Ordered conversation state handed to the model each turn.

use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// The message list for one conversation, oldest first.
///
/// Grows by [`push`](ChatContext::push); the only mid-list mutation is the
/// injector's single insertion before the latest user message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatContext {
    messages: Vec<ChatMessage>,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Index of the most recent user message, scanning from the end.
    pub fn last_user_index(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|message| message.role == ChatRole::User)
    }

    pub(crate) fn insert(&mut self, index: usize, message: ChatMessage) {
        self.messages.insert(index, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_user_index_scans_from_the_end() {
        let mut context = ChatContext::new();
        context.push(ChatMessage::system("You are a support agent."));
        context.push(ChatMessage::user("First question"));
        context.push(ChatMessage::assistant("First answer"));
        context.push(ChatMessage::user("Second question"));

        assert_eq!(context.last_user_index(), Some(3));
    }

    #[test]
    fn last_user_index_is_none_without_user_messages() {
        let mut context = ChatContext::new();
        assert_eq!(context.last_user_index(), None);

        context.push(ChatMessage::system("You are a support agent."));
        context.push(ChatMessage::assistant("Hello!"));
        assert_eq!(context.last_user_index(), None);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }
}
