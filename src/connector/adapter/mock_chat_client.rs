use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::ChatClient;
use crate::domain::DomainError;

/// A [`ChatClient`] that plays back canned answers in order, for tests and
/// offline demos of the LLM-backed adapters. Running out of answers is an
/// upstream error, the same as an unreachable model.
pub struct MockChatClient {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl MockChatClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// User prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, DomainError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(user.to_string());
        }
        let next = self
            .responses
            .lock()
            .map_err(|_| DomainError::internal("MockChatClient: response queue poisoned"))?
            .pop_front();
        debug!("MockChatClient answering: {:?}", next);
        next.ok_or_else(|| DomainError::upstream("MockChatClient: no scripted response left"))
    }
}
