use serde::Serialize;
use thiserror::Error;

/// One named argument a tool accepts. The `type` tag is the loose kind
/// advertised to the model ("string", "number"), not a validated schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolParameter {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub required: bool,
}

impl ToolParameter {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        type_tag: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            type_tag: type_tag.into(),
            required,
        }
    }
}

/// Declared surface of a tool: what the prompt shows the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "params")]
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Renders the single catalog line the prompt template embeds for this
    /// tool. The args array deliberately omits `required`; the prose
    /// description is what steers the model.
    pub fn prompt_line(&self) -> String {
        let args: Vec<PromptParameter<'_>> = self
            .parameters
            .iter()
            .map(|parameter| PromptParameter {
                name: &parameter.name,
                description: &parameter.description,
                type_tag: &parameter.type_tag,
            })
            .collect();
        let rendered = serde_json::to_string(&args).unwrap_or_else(|_| "[]".to_string());
        format!("{}: {},args: {}", self.name, self.description, rendered)
    }
}

#[derive(Serialize)]
struct PromptParameter<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(rename = "type")]
    type_tag: &'a str,
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("tool `{0}` has an empty description")]
    EmptyDescription(String),
    #[error("tool `{0}` is already registered")]
    DuplicateTool(String),
    #[error("tool `{tool}` declares parameter `{name}` more than once")]
    DuplicateParameter { tool: String, name: String },
    #[error("tool `{tool}` declares a parameter with an empty name")]
    EmptyParameterName { tool: String },
    #[error("parameter `{name}` of tool `{tool}` has an empty description")]
    EmptyParameterDescription { tool: String, name: String },
    #[error("parameter `{name}` of tool `{tool}` has an empty type tag")]
    EmptyTypeTag { tool: String, name: String },
}
