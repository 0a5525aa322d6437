use async_trait::async_trait;

use super::types::ModelError;

/// A text-completion backend. Implementations receive the fully rendered
/// prompt and the stop words the decoding should halt on.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, ModelError>;
}
