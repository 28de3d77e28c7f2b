use async_trait::async_trait;

use crate::domain::DomainError;

/// Sends a chat-style prompt to an LLM and returns the text it answers with.
///
/// Implementors own transport, serialization and vendor details, so the
/// classifier and extractor built on top (see [`super::LlmIntentClassifier`]
/// and [`super::LlmFieldExtractor`]) stay provider agnostic.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a `system` context message followed by a `user` prompt and return
    /// the assistant's response text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, DomainError>;
}
