//! Runtime-editable system prompt.

use tokio::sync::RwLock;

pub const DEFAULT_ASSISTANT_PROMPT: &str = "You are a helpful voice assistant. \
Answer briefly and conversationally. When document context is provided, \
ground your answer in it and say so when it does not cover the question.";

/// Holds the assistant's base system prompt so it can be swapped at runtime
/// without rebuilding the object graph.
#[derive(Debug)]
pub struct PromptStore {
    prompt: RwLock<String>,
}

impl PromptStore {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: RwLock::new(prompt.into()),
        }
    }

    pub async fn get(&self) -> String {
        self.prompt.read().await.clone()
    }

    pub async fn set(&self, prompt: impl Into<String>) {
        *self.prompt.write().await = prompt.into();
    }
}

impl Default for PromptStore {
    fn default() -> Self {
        Self::new(DEFAULT_ASSISTANT_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_with_default_and_accepts_updates() {
        let store = PromptStore::default();
        assert_eq!(store.get().await, DEFAULT_ASSISTANT_PROMPT);

        store.set("You are a terse archivist.").await;
        assert_eq!(store.get().await, "You are a terse archivist.");
    }
}
