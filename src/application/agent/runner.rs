use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::errors::AgentError;
use super::models::{AgentOptions, AgentOutcome, AgentStep};
use super::parser::{parse_directive, AgentDirective};
use super::prompt;
use crate::model::ModelProvider;
use crate::tooling::ToolRegistry;

/// Observation fed back when the model names a tool that is not registered.
const MISSING_TOOL_OBSERVATION: &str = "the tool not exist";

pub struct AgentRunner {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<ToolRegistry>,
    options: AgentOptions,
    cancellation: CancellationToken,
}

impl AgentRunner {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        registry: Arc<ToolRegistry>,
        options: AgentOptions,
    ) -> Self {
        Self {
            provider,
            registry,
            options,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Runs the query, restarting from scratch on failure until the configured
    /// attempts are spent. The error of the last attempt is the one returned.
    pub async fn execute_with_retry(
        &self,
        query: &str,
        chat_history: &mut Vec<(String, String)>,
    ) -> Result<AgentOutcome, AgentError> {
        let attempts = self.options.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.execute(query, chat_history).await {
                Ok(outcome) => {
                    if attempt > 1 {
                        info!(attempt, "Agent recovered after retry");
                    }
                    return Ok(outcome);
                }
                Err(AgentError::Cancelled) => return Err(AgentError::Cancelled),
                Err(error) if attempt < attempts => {
                    warn!(attempt, %error, "Agent attempt failed; retrying");
                    attempt += 1;
                }
                Err(error) => {
                    warn!(attempt, %error, "Agent attempt failed");
                    return Err(error);
                }
            }
        }
    }

    /// One full think/act/observe run. A successful run appends the
    /// (query, answer) pair to `chat_history`; failed runs leave it alone.
    pub async fn execute(
        &self,
        query: &str,
        chat_history: &mut Vec<(String, String)>,
    ) -> Result<AgentOutcome, AgentError> {
        info!("Agent run started");
        let tool_descs = self.registry.prompt_catalog();
        let tool_names = self.registry.tool_names();
        let today = prompt::today();
        let rendered_history = prompt::render_history(chat_history);

        let mut scratchpad = String::new();
        let mut steps = Vec::new();

        for iteration in 1..=self.options.max_iterations {
            if self.cancellation.is_cancelled() {
                info!(iteration, "Agent run cancelled");
                return Err(AgentError::Cancelled);
            }

            let rendered = prompt::render_prompt(
                &today,
                &tool_descs,
                &tool_names,
                &rendered_history,
                query,
                &scratchpad,
            );
            debug!(
                iteration,
                prompt_chars = rendered.len(),
                "Submitting agent turn to model provider"
            );
            let response = self
                .provider
                .complete(&rendered, &self.options.stop_words)
                .await?;

            match parse_directive(&response) {
                AgentDirective::Final { answer } => {
                    info!(iteration, "Agent returned final answer");
                    chat_history.push((query.to_string(), answer.clone()));
                    return Ok(AgentOutcome {
                        answer,
                        steps,
                        scratchpad,
                    });
                }
                AgentDirective::Malformed => {
                    warn!(iteration, "Model response does not follow the action format");
                    return Err(AgentError::ProtocolFormat);
                }
                AgentDirective::CallTool {
                    thought,
                    tool,
                    input,
                    observation_missing,
                } => {
                    let observation = if self.registry.contains(&tool) {
                        info!(tool = %tool, "Agent requested tool execution");
                        let observation = self.registry.dispatch(&tool, &input).await;
                        debug!(source = %observation.source, "Observation recorded");
                        observation.text
                    } else {
                        warn!(tool = %tool, "Agent requested an unregistered tool");
                        MISSING_TOOL_OBSERVATION.to_string()
                    };
                    steps.push(AgentStep {
                        thought,
                        tool,
                        input,
                        observation: observation.clone(),
                    });
                    scratchpad.push_str(&response);
                    if observation_missing {
                        scratchpad.push_str("Observation: ");
                    }
                    scratchpad.push_str(&observation);
                    scratchpad.push('\n');
                }
            }
        }

        warn!(
            limit = self.options.max_iterations,
            "Agent exceeded max iterations"
        );
        Err(AgentError::IterationLimitExceeded {
            limit: self.options.max_iterations,
        })
    }
}
