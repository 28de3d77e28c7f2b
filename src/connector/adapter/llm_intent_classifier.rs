use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::llm_json::{first_object, text_field};
use super::ChatClient;
use crate::application::IntentClassifier;
use crate::domain::{Classification, DomainError, FollowUp, Intent, Role, Turn};

const SYSTEM_PROMPT: &str = "\
You are the router of a customer service assistant for an online music store.
Classify the customer's latest message into one of these categories:

1. refund - they mention a refund, a return, money back, or are unhappy with a purchase
2. music_query - they ask about songs, artists, albums, genres or recommendations
3. general - they greet you, thank you, or ask what you can do

If the message asks for two different things, report the first as `intent` and
the other as `follow_up`, with `text` holding the words of that second request.

Return ONLY a JSON object, no prose, no code fences:
{\"intent\": \"refund\", \"follow_up\": {\"intent\": \"music_query\", \"text\": \"find something similar\"}}
Use \"follow_up\": null when there is a single request.";

/// [`IntentClassifier`] backed by an LLM. Transport failures and answers that
/// cannot be read as a classification are reported as
/// [`DomainError::ClassifierUnavailable`].
pub struct LlmIntentClassifier {
    client: Arc<dyn ChatClient>,
}

impl LlmIntentClassifier {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }

    fn prompt(utterance: &str, history: &[Turn]) -> String {
        if history.is_empty() {
            return utterance.to_string();
        }
        let mut prompt = String::from("Conversation so far:\n");
        for turn in history {
            let speaker = match turn.role {
                Role::User => "customer",
                Role::Assistant => "assistant",
            };
            prompt.push_str(&format!("{}: {}\n", speaker, turn.text));
        }
        prompt.push_str(&format!("\nLatest message:\n{}", utterance));
        prompt
    }

    fn parse(text: &str) -> Option<Classification> {
        let map = first_object(text)?;
        let intent = Intent::parse(&text_field(&map, "intent")?)?;
        let mut classification = Classification::new(intent);

        if let Some(serde_json::Value::Object(follow_up)) = map.get("follow_up") {
            let secondary = text_field(follow_up, "intent").and_then(|label| Intent::parse(&label));
            let words = text_field(follow_up, "text");
            if let (Some(secondary), Some(words)) = (secondary, words) {
                classification = classification.with_follow_up(FollowUp::new(secondary, words));
            }
        }
        Some(classification)
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, utterance: &str, history: &[Turn]) -> Result<Classification, DomainError> {
        let answer = self
            .client
            .complete(SYSTEM_PROMPT, &Self::prompt(utterance, history))
            .await
            .map_err(DomainError::into_classifier_failure)?;
        debug!("LlmIntentClassifier raw response: {}", answer);

        Self::parse(&answer).ok_or_else(|| {
            warn!("LlmIntentClassifier: could not read a classification from: {}", answer);
            DomainError::ClassifierUnavailable("unreadable classification".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::adapter::MockChatClient;

    #[test]
    fn parse_reads_intent_and_follow_up() {
        let parsed = LlmIntentClassifier::parse(
            r#"{"intent": "refund", "follow_up": {"intent": "music_query", "text": "find something similar"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.intent(), Intent::Refund);
        assert_eq!(parsed.follow_up().map(|f| f.intent), Some(Intent::MusicQuery));
    }

    #[test]
    fn parse_accepts_the_hello_label() {
        let parsed = LlmIntentClassifier::parse(r#"{"intent": "hello", "follow_up": null}"#).unwrap();
        assert_eq!(parsed.intent(), Intent::General);
        assert!(parsed.follow_up().is_none());
    }

    #[test]
    fn prompt_includes_history() {
        let history = vec![Turn::user("I need a refund"), Turn::assistant("Sure, your name?")];
        let prompt = LlmIntentClassifier::prompt("Aaron Mitchell", &history);
        assert!(prompt.contains("customer: I need a refund"));
        assert!(prompt.ends_with("Aaron Mitchell"));
    }

    #[tokio::test]
    async fn unreadable_answer_is_a_classifier_failure() {
        let classifier = LlmIntentClassifier::new(Arc::new(MockChatClient::new(["I think it's a refund?"])));
        let err = classifier.classify("refund please", &[]).await.unwrap_err();
        assert!(matches!(err, DomainError::ClassifierUnavailable(_)));
    }

    #[tokio::test]
    async fn transport_failure_is_a_classifier_failure() {
        let classifier = LlmIntentClassifier::new(Arc::new(MockChatClient::new(Vec::<String>::new())));
        let err = classifier.classify("hi", &[]).await.unwrap_err();
        assert!(err.is_understanding_failure());
    }
}
