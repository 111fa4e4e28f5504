use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::error::ToolInvokeError;

/// Declared shape of a tool, advertised to the generation engine. The
/// parameter schema is documentation for the engine only; the dispatcher
/// never enforces it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[schema(value_type = Object)]
    pub parameters: Value,
}

/// One externally invocable capability. Implementations receive only their
/// own keyword arguments, never the conversation, and are responsible for
/// validating their required parameters.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the accepted arguments.
    fn parameters(&self) -> Value;

    async fn invoke(&self, arguments: Map<String, Value>) -> Result<Value, ToolInvokeError>;

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}
