use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider '{provider}' has no API key configured")]
    MissingApiKey { provider: String },
    #[error("request to provider '{provider}' failed")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' rejected the request: {code}: {message} (request id {request_id})")]
    Service {
        provider: String,
        request_id: String,
        code: String,
        message: String,
    },
    #[error("provider '{provider}' returned an invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl ModelError {
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn service(
        provider: impl Into<String>,
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Service {
            provider: provider.into(),
            request_id: request_id.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Short text shown to the person at the prompt, without the wire detail.
    pub fn user_message(&self) -> String {
        match self {
            ModelError::MissingApiKey { provider } => {
                format!("模型服务 '{provider}' 缺少 API key，请检查环境变量设置。")
            }
            ModelError::Network { provider, source } => {
                if source.is_connect() {
                    format!("无法连接到模型服务 '{provider}'，请确认服务已启动。")
                } else if source.is_timeout() {
                    format!("请求模型服务 '{provider}' 超时，请稍后重试。")
                } else if let Some(status) = source.status() {
                    match status {
                        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                            format!("模型服务 '{provider}' 鉴权失败，请检查 API key。")
                        }
                        StatusCode::TOO_MANY_REQUESTS => {
                            format!("模型服务 '{provider}' 请求过于频繁，请稍后重试。")
                        }
                        status if status.is_server_error() => {
                            format!("模型服务 '{provider}' 暂时不可用，请稍后重试。")
                        }
                        _ => format!("请求模型服务 '{provider}' 失败，请稍后重试。"),
                    }
                } else {
                    format!("请求模型服务 '{provider}' 失败，请稍后重试。")
                }
            }
            ModelError::Service { provider, code, .. } => {
                format!("模型服务 '{provider}' 调用失败：{code}。")
            }
            ModelError::InvalidResponse { provider, .. } => {
                format!("模型服务 '{provider}' 返回了无效响应，请稍后重试。")
            }
        }
    }
}
