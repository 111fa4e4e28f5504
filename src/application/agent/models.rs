use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use utoipa::ToSchema;

use crate::model::SamplingConfig;
use crate::types::Conversation;

pub(crate) const DEFAULT_MAX_STEPS: usize = 8;

/// What the loop does after folding a tool result into the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContinuationPolicy {
    /// Re-enter generation directly on the updated conversation.
    #[default]
    Direct,
    /// Inject a synthetic user turn asking the engine to summarize the tool
    /// result before continuing.
    Summarize,
}

/// Why the turn ended. A generation failure is not represented here; it
/// aborts the turn as an error instead of finalizing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationReason {
    Completed,
    MaxIterations,
}

/// One executed tool call, reported to front ends alongside the answer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AgentStep {
    pub tool: String,
    #[schema(value_type = Object)]
    pub arguments: Map<String, Value>,
    pub success: bool,
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct AgentOutcome {
    /// Full turn history including the finalized last message.
    pub conversation: Conversation,
    /// Content of the finalized message.
    pub response: String,
    pub steps: Vec<AgentStep>,
    pub termination: TerminationReason,
}

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub model: String,
    pub max_steps: usize,
    pub continuation: ContinuationPolicy,
    pub thinking: bool,
    pub sampling: SamplingConfig,
    /// Deadline applied to each generation call and each tool invocation.
    /// Both block on external collaborators and would otherwise hang the
    /// turn indefinitely. `None` disables the deadline.
    pub step_timeout: Option<Duration>,
}

impl AgentOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_steps: DEFAULT_MAX_STEPS,
            continuation: ContinuationPolicy::default(),
            thinking: false,
            sampling: SamplingConfig::default(),
            step_timeout: None,
        }
    }
}
