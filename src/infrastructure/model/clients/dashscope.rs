use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::model::{HttpClientBase, ModelError, ModelProvider, resolve_api_key};
use crate::types::{ChatMessage, MessageRole};

const GENERATION_PATH: &str = "/api/v1/services/aigc/text-generation/generation";
const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// DashScope text-generation client (qwen family).
pub struct DashScopeClient {
    base: HttpClientBase,
    model: String,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    model: &'a str,
    input: GenerationInput,
    parameters: GenerationParameters,
}

#[derive(Serialize)]
struct GenerationInput {
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct GenerationParameters {
    result_format: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct GenerationResponse {
    output: GenerationOutput,
}

#[derive(Deserialize)]
struct GenerationOutput {
    choices: Vec<GenerationChoice>,
}

#[derive(Deserialize)]
struct GenerationChoice {
    message: GenerationMessage,
}

#[derive(Deserialize)]
struct GenerationMessage {
    content: String,
}

#[derive(Deserialize)]
struct GenerationFailure {
    #[serde(default)]
    request_id: String,
    code: String,
    message: String,
}

impl DashScopeClient {
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
        }
    }
}

#[async_trait]
impl ModelProvider for DashScopeClient {
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, ModelError> {
        let url = self.base.build_url(GENERATION_PATH);
        let payload = GenerationRequest {
            model: &self.model,
            input: GenerationInput {
                messages: vec![
                    ChatMessage::new(MessageRole::System, SYSTEM_PROMPT),
                    ChatMessage::new(MessageRole::User, prompt),
                ],
            },
            parameters: GenerationParameters {
                result_format: "message",
                stop: stop.to_vec(),
            },
        };

        info!(model = %self.model, "Sending DashScope generation request");
        let response = self.base.post_with_bearer_raw(&url, &payload).await?;
        let status = response.status();
        if !status.is_success() {
            let failure = response
                .json::<GenerationFailure>()
                .await
                .unwrap_or_else(|_| GenerationFailure {
                    request_id: String::new(),
                    code: status.to_string(),
                    message: "unparseable error body".to_string(),
                });
            warn!(
                code = %failure.code,
                request_id = %failure.request_id,
                "DashScope rejected the request"
            );
            return Err(ModelError::service(
                &self.base.id,
                failure.request_id,
                failure.code,
                failure.message,
            ));
        }

        let parsed = response
            .json::<GenerationResponse>()
            .await
            .map_err(|source| ModelError::network(&self.base.id, source))?;
        let content = parsed
            .output
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ModelError::invalid_response(&self.base.id, "missing message content"))?;
        debug!(chars = content.len(), "Received DashScope completion");
        Ok(content)
    }
}
