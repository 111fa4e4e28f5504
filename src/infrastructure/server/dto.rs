use crate::agent::{AgentStep, ContinuationPolicy, TerminationReason};
use crate::tooling::ToolSchema;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RestChatRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub session_id: Option<String>,
    #[serde(default)]
    pub max_tool_steps: Option<usize>,
    #[serde(default)]
    pub continuation: Option<ContinuationPolicy>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RestChatResponse {
    pub session_id: String,
    pub content: String,
    pub termination: TerminationReason,
    pub tool_steps: Vec<AgentStep>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ToolInventoryResponse {
    pub tools: Vec<ToolSchema>,
}
