use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::error::Error;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::retrieval::RetrievalError;
use super::schema::{SchemaError, ToolDefinition};

/// Suffix some chat templates leave glued to the generated argument text.
const OBSERVATION_SENTINEL: &str = "<|observation|>";

const SYSTEM_ERROR_SOURCE: &str = "system_error";

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, arguments: Value) -> Result<String, ToolInvokeError>;
}

#[derive(Debug, Error)]
pub enum ToolInvokeError {
    #[error("missing required argument `{0}`")]
    MissingArgument(String),
    #[error("argument `{name}` must be {expected}")]
    InvalidArgument { name: String, expected: &'static str },
    #[error("{0}")]
    Failed(String),
    #[error("retrieval request failed")]
    Retrieval(#[from] RetrievalError),
}

/// Result of one dispatch, tagged with where the text came from: the tool's
/// own name on success, `system_error` for anything that went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolObservation {
    pub source: String,
    pub text: String,
}

impl ToolObservation {
    pub fn from_tool(tool: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: tool.into(),
            text: text.into(),
        }
    }

    pub fn system_error(text: impl Into<String>) -> Self {
        Self {
            source: SYSTEM_ERROR_SOURCE.to_string(),
            text: text.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DispatchFailure {
    #[error("Error decoding JSON: {0}")]
    Decode(serde_json::Error),
    #[error("Tool `{0}` not found. Please use a provided tool.")]
    UnknownTool(String),
    #[error("tool `{tool}` execution failed")]
    Execution {
        tool: String,
        #[source]
        source: ToolInvokeError,
    },
}

impl DispatchFailure {
    /// Text fed back to the model as the observation. The Display strings of
    /// `Decode` and `UnknownTool` are the wire contract; execution failures
    /// flatten their cause chain so the model sees the actual reason.
    pub fn observation_text(&self) -> String {
        match self {
            DispatchFailure::Execution { .. } => error_chain(self),
            other => other.to_string(),
        }
    }
}

fn error_chain(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// Holds every tool the agent may call. Definitions keep their registration
/// order, which is the order the prompt catalog lists them in.
#[derive(Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    handlers: HashMap<String, Box<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        definition: ToolDefinition,
        handler: impl ToolHandler + 'static,
    ) -> Result<(), SchemaError> {
        if definition.description.trim().is_empty() {
            return Err(SchemaError::EmptyDescription(definition.name.clone()));
        }
        if self.handlers.contains_key(&definition.name) {
            return Err(SchemaError::DuplicateTool(definition.name.clone()));
        }
        let mut seen = HashSet::new();
        for parameter in &definition.parameters {
            if parameter.name.trim().is_empty() {
                return Err(SchemaError::EmptyParameterName {
                    tool: definition.name.clone(),
                });
            }
            if !seen.insert(parameter.name.as_str()) {
                return Err(SchemaError::DuplicateParameter {
                    tool: definition.name.clone(),
                    name: parameter.name.clone(),
                });
            }
            if parameter.description.trim().is_empty() {
                return Err(SchemaError::EmptyParameterDescription {
                    tool: definition.name.clone(),
                    name: parameter.name.clone(),
                });
            }
            if parameter.type_tag.trim().is_empty() {
                return Err(SchemaError::EmptyTypeTag {
                    tool: definition.name.clone(),
                    name: parameter.name.clone(),
                });
            }
        }
        debug!(tool = %definition.name, parameters = definition.parameters.len(), "Registered tool");
        self.handlers
            .insert(definition.name.clone(), Box::new(handler));
        self.definitions.push(definition);
        Ok(())
    }

    /// Snapshot of every registered definition, in registration order.
    pub fn catalog(&self) -> Vec<ToolDefinition> {
        self.definitions.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn prompt_catalog(&self) -> String {
        self.definitions
            .iter()
            .map(ToolDefinition::prompt_line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_names(&self) -> String {
        self.definitions
            .iter()
            .map(|definition| definition.name.as_str())
            .collect::<Vec<_>>()
            .join(" or ")
    }

    /// Decodes the argument text and invokes the named tool. Decoding runs
    /// before the name lookup, so garbled arguments for an unknown tool
    /// surface as a decode failure.
    pub async fn try_dispatch(
        &self,
        name: &str,
        argument_text: &str,
    ) -> Result<String, DispatchFailure> {
        let code = argument_text
            .trim()
            .trim_end_matches(OBSERVATION_SENTINEL)
            .trim();
        let arguments: Value =
            serde_json::from_str(code).map_err(DispatchFailure::Decode)?;
        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| DispatchFailure::UnknownTool(name.to_string()))?;
        handler
            .invoke(arguments)
            .await
            .map_err(|source| DispatchFailure::Execution {
                tool: name.to_string(),
                source,
            })
    }

    /// Infallible wrapper around [`Self::try_dispatch`]: every failure is
    /// folded into a `system_error` observation the agent loop can feed
    /// straight back to the model.
    pub async fn dispatch(&self, name: &str, argument_text: &str) -> ToolObservation {
        match self.try_dispatch(name, argument_text).await {
            Ok(text) => {
                info!(tool = %name, "Tool call succeeded");
                ToolObservation::from_tool(name, text)
            }
            Err(failure) => {
                warn!(tool = %name, %failure, "Tool call failed");
                ToolObservation::system_error(failure.observation_text())
            }
        }
    }
}
