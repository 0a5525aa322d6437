use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::model::{HttpClientBase, ModelError, ModelProvider, resolve_api_key};
use crate::types::{ChatMessage, MessageRole};

const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

const DEFAULT_TEMPERATURE: f32 = 0.1;
const DEFAULT_TOP_P: f32 = 0.5;
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_PRESENCE_PENALTY: f32 = 1.0;

/// Client for OpenAI-compatible chat-completions servers, such as a local
/// vLLM instance serving glm-4.
pub struct OpenAIClient {
    base: HttpClientBase,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    presence_penalty: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    presence_penalty: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl OpenAIClient {
    pub fn from_config(config: &ProviderConfig) -> Self {
        let api_key = resolve_api_key(config.kind.as_str(), config.api_key_env.as_deref());
        Self {
            base: HttpClientBase::new(
                config.kind.as_str(),
                config.endpoint.clone(),
                api_key,
                config.request_timeout,
            ),
            model: config.model.clone(),
            temperature: config.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            top_p: config.top_p.unwrap_or(DEFAULT_TOP_P),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            presence_penalty: config.presence_penalty.unwrap_or(DEFAULT_PRESENCE_PENALTY),
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAIClient {
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, ModelError> {
        let url = self.base.build_url(CHAT_COMPLETIONS_PATH);
        let payload = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage::new(MessageRole::User, prompt)],
            stream: false,
            stop: stop.to_vec(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
            presence_penalty: self.presence_penalty,
        };

        info!(model = %self.model, "Sending chat completion request");
        let response = if self.base.api_key.is_some() {
            self.base.post_with_bearer(&url, &payload).await?
        } else {
            self.base.post_no_auth(&url, &payload).await?
        };

        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|source| ModelError::network(&self.base.id, source))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| ModelError::invalid_response(&self.base.id, "missing content"))?;
        debug!(chars = content.len(), "Received chat completion");
        Ok(content)
    }
}
