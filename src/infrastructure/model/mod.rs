mod clients;
mod factory;
mod traits;
mod types;

pub use clients::{DashScopeClient, HttpClientBase, OpenAIClient};
pub use factory::{resolve_api_key, ProviderFactory};
pub use traits::ModelProvider;
pub use types::ModelError;
