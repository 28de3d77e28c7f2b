use async_trait::async_trait;

use crate::domain::{Classification, DomainError, Turn};

/// Decides what the customer wants from an utterance.
///
/// `history` is the trailing window of the conversation, oldest first. An
/// utterance mixing two requests yields a primary intent plus a follow-up
/// carrying the text of the secondary one.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, utterance: &str, history: &[Turn]) -> Result<Classification, DomainError>;
}
