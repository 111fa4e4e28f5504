use crate::agent::{
    Agent, AgentError, AgentOptions, AgentStep, ContinuationPolicy, TerminationReason,
};
use crate::model::{GenerationProvider, SamplingConfig};
use crate::tooling::{ToolRegistry, ToolSchema};
use crate::types::{ChatMessage, Conversation, MessageRole};
use chrono::Local;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant with access to tools. Use the available tools when needed. Respond concisely.";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub default_model: String,
    pub default_system_prompt: Option<String>,
    pub max_steps: usize,
    pub continuation: ContinuationPolicy,
    pub thinking: bool,
    pub sampling: SamplingConfig,
    pub step_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            default_model: default_model.into(),
            default_system_prompt: None,
            max_steps: crate::agent::DEFAULT_MAX_STEPS,
            continuation: ContinuationPolicy::default(),
            thinking: false,
            sampling: SamplingConfig::default(),
            step_timeout: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.default_system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_continuation(mut self, continuation: ContinuationPolicy) -> Self {
        self.continuation = continuation;
        self
    }

    pub fn with_thinking(mut self, thinking: bool) -> Self {
        self.thinking = thinking;
        self
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_step_timeout(mut self, step_timeout: Option<Duration>) -> Self {
        self.step_timeout = step_timeout;
        self
    }
}

#[derive(Debug)]
pub struct ChatRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub session_id: Option<String>,
    pub max_tool_steps: Option<usize>,
    pub continuation: Option<ContinuationPolicy>,
}

impl ChatRequest {
    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            system_prompt: None,
            session_id: None,
            max_tool_steps: None,
            continuation: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatResult {
    pub content: String,
    pub session_id: String,
    pub steps: Vec<AgentStep>,
    pub termination: TerminationReason,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Agent(#[from] AgentError),
}

impl ClientError {
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Agent(err) => err.user_message(),
        }
    }
}

/// Session-scoped handle over the orchestration loop: owns the per-session
/// conversations and the shared read-only registry, and runs one turn at a
/// time per conversation.
pub struct ChatClient<P: GenerationProvider> {
    provider: Arc<P>,
    registry: Arc<ToolRegistry>,
    config: ClientConfig,
    sessions: Mutex<HashMap<String, Conversation>>,
}

impl<P: GenerationProvider> ChatClient<P> {
    pub fn new(provider: P, registry: Arc<ToolRegistry>, config: ClientConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            registry,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn tools(&self) -> Vec<ToolSchema> {
        self.registry.schemas()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Runs one full turn for a session: appends the user input, drives the
    /// loop to termination, and persists the updated history. On a fatal
    /// generation failure the stored conversation is never advanced, so the
    /// in-flight user message is effectively retracted.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResult, ClientError> {
        let session_id = request
            .session_id
            .clone()
            .unwrap_or_else(new_session_id);
        let mut working = {
            let sessions = self.sessions.lock().await;
            sessions.get(&session_id).cloned()
        }
        .unwrap_or_else(|| {
            Conversation::from_messages(vec![ChatMessage::system(
                self.compose_system_prompt(request.system_prompt.as_deref()),
            )])
        });
        debug!(
            session_id = session_id.as_str(),
            history_count = working.len(),
            "Starting turn with prior history"
        );
        let options = self.options_for(&request);
        working.push(ChatMessage::user(request.prompt));

        let agent = Agent::new(self.provider.clone(), self.registry.clone());
        let outcome = agent.run(working, options).await?;

        info!(
            session_id = session_id.as_str(),
            termination = ?outcome.termination,
            "Turn completed"
        );
        let result = ChatResult {
            content: outcome.response,
            session_id: session_id.clone(),
            steps: outcome.steps,
            termination: outcome.termination,
        };
        let mut sessions = self.sessions.lock().await;
        sessions.insert(session_id, outcome.conversation);
        Ok(result)
    }

    /// Front-end collaborator contract: given an ordered history of
    /// role/content pairs, run the loop to termination and return the
    /// finalized last message. A missing leading system turn is injected.
    pub async fn resolve_turn(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<ChatMessage, ClientError> {
        let has_system = matches!(
            messages.first(),
            Some(message) if message.role == MessageRole::System
        );
        let mut seeded = Vec::with_capacity(messages.len() + 1);
        if !has_system {
            seeded.push(ChatMessage::system(self.compose_system_prompt(None)));
        }
        seeded.extend(messages);

        let agent = Agent::new(self.provider.clone(), self.registry.clone());
        let outcome = agent
            .run(
                Conversation::from_messages(seeded),
                self.options_for(&ChatRequest::prompt("")),
            )
            .await?;
        Ok(ChatMessage::assistant(outcome.response))
    }

    fn options_for(&self, request: &ChatRequest) -> AgentOptions {
        let mut options = AgentOptions::new(
            request
                .model
                .clone()
                .unwrap_or_else(|| self.config.default_model.clone()),
        );
        options.max_steps = request.max_tool_steps.unwrap_or(self.config.max_steps);
        options.continuation = request.continuation.unwrap_or(self.config.continuation);
        options.thinking = self.config.thinking;
        options.sampling = self.config.sampling.clone();
        options.step_timeout = self.config.step_timeout;
        options
    }

    fn compose_system_prompt(&self, override_prompt: Option<&str>) -> String {
        match override_prompt.or(self.config.default_system_prompt.as_deref()) {
            Some(prompt) => prompt.to_string(),
            None => format!(
                "{DEFAULT_SYSTEM_PROMPT} Current date and time: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
        }
    }
}

fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}
