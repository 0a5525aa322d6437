mod base;
mod dashscope;
mod openai;

pub use base::HttpClientBase;
pub use dashscope::DashScopeClient;
pub use openai::OpenAIClient;
