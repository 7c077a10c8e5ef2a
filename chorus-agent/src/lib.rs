//! # chorus-agent
//!
//! Conversation-side pieces of the document-grounded voice agent: the
//! ordered [`conversation::ChatContext`], a runtime-editable
//! [`prompt::PromptStore`], and the [`injector::TurnContextInjector`] that
//! splices retrieved document context into each turn under a deadline.
//!
//! Retrieval itself lives in `chorus-retriever`; this crate consumes it
//! through the [`injector::ContextSource`] seam, which `RetrievalService`
//! implements.

pub mod conversation;
pub mod injector;
pub mod prompt;

pub use conversation::{ChatContext, ChatMessage, ChatRole};
pub use injector::{ContextSource, GROUNDING_PREAMBLE, InjectionOutcome, TurnContextInjector};
pub use prompt::{DEFAULT_ASSISTANT_PROMPT, PromptStore};
