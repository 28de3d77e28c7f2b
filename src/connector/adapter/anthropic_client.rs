use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::connector::adapter::ChatClient;
use crate::domain::DomainError;

/// Default target: LM Studio running locally on its standard port.
pub const DEFAULT_BASE_URL: &str = "http://localhost:1234";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "ministral-3b-2512";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PROBE_TIMEOUT_SECS: u64 = 2;
const MAX_TOKENS: u32 = 512;

/// Connection settings for [`AnthropicClient`].
///
/// | Variable             | Default                 |
/// |----------------------|-------------------------|
/// | `ANTHROPIC_BASE_URL` | `http://localhost:1234` |
/// | `ANTHROPIC_MODEL`    | `ministral-3b-2512`     |
/// | `ANTHROPIC_API_KEY`  | empty                   |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnthropicSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for AnthropicSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl AnthropicSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ANTHROPIC_BASE_URL").unwrap_or(defaults.base_url),
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or(defaults.api_key),
            model: std::env::var("ANTHROPIC_MODEL").unwrap_or(defaults.model),
            timeout: defaults.timeout,
        }
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [ApiMessage<'a>; 1],
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// [`ChatClient`] over the Anthropic Messages API or any compatible server
/// such as LM Studio.
///
/// Requests run at temperature 0 since callers parse the answer as JSON.
/// Each request is preceded by a `HEAD /` probe with a short timeout, so an
/// unreachable server fails the turn quickly. Every failure surfaces as
/// [`DomainError::UpstreamError`].
pub struct AnthropicClient {
    client: reqwest::Client,
    probe_client: reqwest::Client,
    settings: AnthropicSettings,
    /// Full endpoint URL (base + MESSAGES_PATH).
    url: String,
    /// Base URL used for the probe, with a trailing slash.
    probe_url: String,
}

impl AnthropicClient {
    pub fn new(settings: AnthropicSettings) -> Self {
        let trimmed = settings.base_url.trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::builder()
                .timeout(settings.timeout)
                .build()
                .unwrap_or_default(),
            probe_client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
                .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            url: format!("{trimmed}{MESSAGES_PATH}"),
            probe_url: format!("{trimmed}/"),
            settings,
        }
    }

    pub fn from_env() -> Self {
        Self::new(AnthropicSettings::from_env())
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }

    async fn probe(&self) -> Result<(), DomainError> {
        match self.probe_client.head(&self.probe_url).send().await {
            Err(e) if e.is_connect() || e.is_timeout() => Err(DomainError::upstream(format!(
                "AnthropicClient: server not reachable at {}: {e}",
                self.probe_url.trim_end_matches('/')
            ))),
            // Any HTTP response, even 4xx/5xx, means the server is up.
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DomainError> {
        self.probe().await?;

        let request = ApiRequest {
            model: &self.settings.model,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            system,
            messages: [ApiMessage {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::upstream(format!("AnthropicClient: request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("AnthropicClient: API returned {status}: {body}");
            return Err(DomainError::upstream(format!(
                "AnthropicClient: API returned {status}"
            )));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| {
            DomainError::upstream(format!("AnthropicClient: failed to parse response: {e}"))
        })?;

        let text: String = api_response.content.into_iter().map(|b| b.text).collect();
        debug!("AnthropicClient: {} chars from {}", text.len(), self.settings.model);
        Ok(text)
    }
}
