mod builtins;
mod registry;
mod retrieval;
mod schema;

pub use builtins::{builtin_registry, CalculatorTool, MilvusSearchTool};
pub use registry::{DispatchFailure, ToolHandler, ToolInvokeError, ToolObservation, ToolRegistry};
pub use retrieval::{format_hits, RetrievalClient, RetrievalError, RetrievalHit};
pub use schema::{SchemaError, ToolDefinition, ToolParameter};
