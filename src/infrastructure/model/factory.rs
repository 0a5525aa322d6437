use std::env;
use std::sync::Arc;
use tracing::warn;

use super::clients::{DashScopeClient, OpenAIClient};
use super::traits::ModelProvider;
use crate::config::{ProviderConfig, ProviderKind};

/// Reads the configured environment variable, if any. A variable that is
/// missing or unreadable logs a warning and yields `None`; providers that
/// cannot run without a key fail later with a clearer error.
pub fn resolve_api_key(provider: &str, env_var: Option<&str>) -> Option<String> {
    let name = env_var.map(str::trim).filter(|name| !name.is_empty())?;
    match env::var(name) {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(provider, env_var = name, %error, "API key environment variable not available");
            None
        }
    }
}

pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: &ProviderConfig) -> Arc<dyn ModelProvider> {
        match config.kind {
            ProviderKind::DashScope => Arc::new(DashScopeClient::from_config(config)),
            ProviderKind::OpenAi => Arc::new(OpenAIClient::from_config(config)),
        }
    }
}
