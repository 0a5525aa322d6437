use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

const DEFAULT_ENDPOINT: &str = "https://dashscope.aliyuncs.com";
const DEFAULT_MODEL: &str = "qwen-turbo";
const DEFAULT_API_KEY_ENV: &str = "DASHSCOPE_API_KEY";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

const DEFAULT_MAX_ITERATIONS: usize = 10;
const DEFAULT_MAX_ATTEMPTS: usize = 3;
const DEFAULT_STOP_WORD: &str = "Observation:";
const DEFAULT_HISTORY_WINDOW: usize = 10;

const DEFAULT_RETRIEVAL_ENDPOINT: &str = "http://127.0.0.1:8000";
const DEFAULT_RETRIEVAL_TOP_K: usize = 3;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub agent: AgentConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub endpoint: String,
    pub model: String,
    pub api_key_env: Option<String>,
    pub request_timeout: Duration,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub presence_penalty: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    DashScope,
    OpenAi,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::DashScope => "dashscope",
            ProviderKind::OpenAi => "openai",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub max_attempts: usize,
    pub stop_words: Vec<String>,
    pub history_window: usize,
}

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub endpoint: String,
    pub top_k: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    provider: RawProvider,
    #[serde(default)]
    agent: RawAgent,
    #[serde(default)]
    retrieval: RawRetrieval,
}

#[derive(Debug, Deserialize, Default)]
struct RawProvider {
    kind: Option<ProviderKind>,
    endpoint: Option<String>,
    model: Option<String>,
    api_key_env: Option<String>,
    request_timeout_secs: Option<u64>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: Option<u32>,
    presence_penalty: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct RawAgent {
    max_iterations: Option<usize>,
    max_attempts: Option<usize>,
    stop_words: Option<Vec<String>>,
    history_window: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct RawRetrieval {
    endpoint: Option<String>,
    top_k: Option<usize>,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return read_config(path);
        }
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        match read_config(default_path) {
            Ok(config) => Ok(config),
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("Configuration file not found; using defaults");
                Ok(Self::default())
            }
            Err(other) => Err(other),
        }
    }

    pub fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }

    fn from_raw(parsed: RawConfig) -> Self {
        Self {
            provider: ProviderConfig {
                kind: parsed.provider.kind.unwrap_or(ProviderKind::DashScope),
                endpoint: parsed
                    .provider
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
                model: parsed
                    .provider
                    .model
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                api_key_env: Some(
                    parsed
                        .provider
                        .api_key_env
                        .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
                ),
                request_timeout: Duration::from_secs(
                    parsed
                        .provider
                        .request_timeout_secs
                        .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
                ),
                temperature: parsed.provider.temperature,
                top_p: parsed.provider.top_p,
                max_tokens: parsed.provider.max_tokens,
                presence_penalty: parsed.provider.presence_penalty,
            },
            agent: AgentConfig {
                max_iterations: parsed.agent.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
                max_attempts: parsed.agent.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
                stop_words: parsed
                    .agent
                    .stop_words
                    .unwrap_or_else(|| vec![DEFAULT_STOP_WORD.to_string()]),
                history_window: parsed
                    .agent
                    .history_window
                    .unwrap_or(DEFAULT_HISTORY_WINDOW),
            },
            retrieval: RetrievalConfig {
                endpoint: parsed
                    .retrieval
                    .endpoint
                    .unwrap_or_else(|| DEFAULT_RETRIEVAL_ENDPOINT.to_string()),
                top_k: parsed.retrieval.top_k.unwrap_or(DEFAULT_RETRIEVAL_TOP_K),
            },
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading agent configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(AppConfig::from_raw(parsed))
}
