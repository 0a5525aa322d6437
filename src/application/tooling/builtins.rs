use async_trait::async_trait;
use serde_json::Value;

use super::registry::{ToolHandler, ToolInvokeError, ToolRegistry};
use super::retrieval::{format_hits, RetrievalClient};
use super::schema::{SchemaError, ToolDefinition, ToolParameter};

const MILVUS_SEARCH_DESCRIPTION: &str = "这是一个存储政务资料的数据库，可以用来搜索与政务相关的问题，如果你不确定就应该用来搜索一下。需要注意的是，搜索结果可能包含脏数据或不相关数据，你需要根据query与结果的相似度酌情使用。";

const CALCULATOR_DESCRIPTION: &str =
    "一个简单的计算器，可以进行加减乘除四则运算，输入两个数字和运算类型，返回计算结果。";

/// Searches the government-affairs knowledge base and renders the hits as a
/// reference block.
pub struct MilvusSearchTool {
    client: RetrievalClient,
}

impl MilvusSearchTool {
    pub fn new(client: RetrievalClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolHandler for MilvusSearchTool {
    async fn invoke(&self, arguments: Value) -> Result<String, ToolInvokeError> {
        let query = match arguments.get("query") {
            Some(value) => value.as_str().ok_or(ToolInvokeError::InvalidArgument {
                name: "query".to_string(),
                expected: "a string",
            })?,
            None => return Err(ToolInvokeError::MissingArgument("query".to_string())),
        };
        let hits = self.client.search(query).await?;
        Ok(format_hits(&hits))
    }
}

/// Four-function calculator over two numbers.
pub struct CalculatorTool;

#[async_trait]
impl ToolHandler for CalculatorTool {
    async fn invoke(&self, arguments: Value) -> Result<String, ToolInvokeError> {
        let a = number_argument(&arguments, "a")?;
        let b = number_argument(&arguments, "b")?;
        let op = arguments.get("op").and_then(Value::as_str).unwrap_or("add");
        let result = match op {
            "add" => a + b,
            "sub" => a - b,
            "mul" => a * b,
            "div" => {
                if b == 0.0 {
                    return Err(ToolInvokeError::Failed("division by zero".to_string()));
                }
                a / b
            }
            other => {
                return Err(ToolInvokeError::Failed(format!(
                    "unsupported operation `{other}`"
                )));
            }
        };
        Ok(format_number(result))
    }
}

fn number_argument(arguments: &Value, name: &str) -> Result<f64, ToolInvokeError> {
    match arguments.get(name) {
        Some(value) => value.as_f64().ok_or(ToolInvokeError::InvalidArgument {
            name: name.to_string(),
            expected: "a number",
        }),
        None => Err(ToolInvokeError::MissingArgument(name.to_string())),
    }
}

/// Integral results print without a decimal point so `3 + 5` reads `8`.
/// Magnitudes outside the i64 range keep the float rendering.
fn format_number(value: f64) -> String {
    // `i64::MAX as f64` rounds up to 2^63, one past i64::MAX, so the cast
    // is only exact below that bound.
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Builds the registry the agent ships with: knowledge-base search first,
/// then the calculator.
pub fn builtin_registry(retrieval: RetrievalClient) -> Result<ToolRegistry, SchemaError> {
    let mut registry = ToolRegistry::new();
    registry.register(
        ToolDefinition::new("milvus_search", MILVUS_SEARCH_DESCRIPTION).with_parameter(
            ToolParameter::new("query", "与政务相关的问题", "string", true),
        ),
        MilvusSearchTool::new(retrieval),
    )?;
    registry.register(
        ToolDefinition::new("calculator", CALCULATOR_DESCRIPTION)
            .with_parameter(ToolParameter::new("a", "第一个运算数", "number", true))
            .with_parameter(ToolParameter::new("b", "第二个运算数", "number", true))
            .with_parameter(ToolParameter::new(
                "op",
                "运算类型，可选 add、sub、mul、div，默认为 add",
                "string",
                false,
            )),
        CalculatorTool,
    )?;
    Ok(registry)
}
