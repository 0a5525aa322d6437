use thiserror::Error;

use crate::model::ModelError;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model response does not follow the expected action format")]
    ProtocolFormat,
    #[error("agent exceeded the maximum of {limit} iterations")]
    IterationLimitExceeded { limit: usize },
    #[error("agent run cancelled")]
    Cancelled,
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl AgentError {
    /// Short text shown to the person at the prompt.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::ProtocolFormat => "LLM回复格式异常".to_string(),
            AgentError::IterationLimitExceeded { .. } => {
                "思考次数过多，已停止本次回答，请换个问法再试。".to_string()
            }
            AgentError::Cancelled => "本次回答已取消。".to_string(),
            AgentError::Model(error) => error.user_message(),
        }
    }
}
