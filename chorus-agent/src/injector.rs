//! Splices retrieved document context into a conversation turn.
//!
//! The injector runs once per turn, just before the context is handed to the
//! model. It is the only point where the voice loop waits on retrieval, so
//! the wait is bounded by a timeout and every failure mode degrades to "no
//! grounding this turn" rather than an error.

use crate::conversation::{ChatContext, ChatMessage};
use async_trait::async_trait;
use chorus_retriever::RetrievalService;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Instruction line prepended to the formatted document blocks.
pub const GROUNDING_PREAMBLE: &str =
    "Use the following document context to answer the user's question:";

/// Something that can produce grounding text for a query.
///
/// `Ok(None)` means the source looked and found nothing relevant, which the
/// injector treats differently from an error: both leave the context
/// untouched, but they are reported as distinct outcomes.
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn grounding_context(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> anyhow::Result<Option<String>>;
}

#[async_trait]
impl ContextSource for RetrievalService {
    async fn grounding_context(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> anyhow::Result<Option<String>> {
        let results = self.retrieve(query, top_k).await;
        if results.is_empty() {
            return Ok(None);
        }
        Ok(Some(RetrievalService::format_context(&results)))
    }
}

/// What happened on one injection attempt. Purely observational; callers
/// proceed with the turn regardless of the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionOutcome {
    /// A grounding message was inserted before the latest user message.
    Injected,
    /// No user message in the context; nothing to ground.
    Skipped,
    /// The source found no relevant context.
    Empty,
    /// Retrieval did not finish within the deadline; any late result is
    /// dropped.
    TimedOut,
    /// The source returned an error.
    Failed,
}

pub struct TurnContextInjector {
    source: Arc<dyn ContextSource>,
    timeout: Duration,
    top_k: Option<usize>,
}

impl TurnContextInjector {
    pub fn new(source: Arc<dyn ContextSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            top_k: None,
        }
    }

    /// Override the source's default result count.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Makes a single bounded retrieval attempt for the latest user message
    /// and, on success, inserts one system grounding message immediately
    /// before it. On any other outcome the context is left untouched.
    pub async fn inject(&self, context: &mut ChatContext) -> InjectionOutcome {
        let Some(user_index) = context.last_user_index() else {
            tracing::debug!("no user message in context, skipping grounding");
            return InjectionOutcome::Skipped;
        };
        let query = context.messages()[user_index].content.clone();

        let attempt = tokio::time::timeout(
            self.timeout,
            self.source.grounding_context(&query, self.top_k),
        );
        let outcome = match attempt.await {
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "context retrieval timed out, continuing ungrounded"
                );
                InjectionOutcome::TimedOut
            }
            Ok(Err(error)) => {
                tracing::error!(error = %error, "context retrieval failed, continuing ungrounded");
                InjectionOutcome::Failed
            }
            Ok(Ok(None)) => {
                tracing::debug!("no relevant context for query");
                InjectionOutcome::Empty
            }
            Ok(Ok(Some(grounding))) => {
                context.insert(
                    user_index,
                    ChatMessage::system(format!("{GROUNDING_PREAMBLE}\n\n{grounding}")),
                );
                InjectionOutcome::Injected
            }
        };
        tracing::debug!(?outcome, "turn grounding attempt finished");
        outcome
    }
}
