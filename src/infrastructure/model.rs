use crate::tooling::ToolSchema;
use crate::types::ChatMessage;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Sampling parameters forwarded to the generation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
    pub max_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.8,
            top_k: 20,
            repeat_penalty: 1.0,
            max_tokens: 5000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
    pub sampling: SamplingConfig,
    /// Ask the engine to emit an internal reasoning block; the composer
    /// strips it either way.
    pub thinking: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub content: String,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("generation engine returned invalid response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Network(err) => {
                if err.is_connect() {
                    "Could not reach the generation engine. Make sure the Ollama server is running and reachable."
                        .to_string()
                } else if err.is_timeout() {
                    "The request to the generation engine timed out. Try again in a moment."
                        .to_string()
                } else if let Some(status) = err.status() {
                    match status {
                        StatusCode::NOT_FOUND => {
                            "The generation endpoint was not found (404). Check that the server exposes /api/chat."
                                .to_string()
                        }
                        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
                            "The generation engine is currently unavailable. Try again later."
                                .to_string()
                        }
                        _ => format!(
                            "The request to the generation engine failed with status {}. Try again later.",
                            status.as_u16()
                        ),
                    }
                } else {
                    "A network error occurred while contacting the generation engine. Try again later."
                        .to_string()
                }
            }
            GenerationError::InvalidResponse(_) => {
                "The generation engine returned a response that could not be processed. Try again."
                    .to_string()
            }
        }
    }
}

/// External collaborator producing text continuations from a conversation
/// and the advertised tool schemas. A failure here is fatal for the turn.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, request: GenerationRequest)
    -> Result<GenerationResponse, GenerationError>;
}

#[derive(Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            http: client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let trimmed = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{trimmed}/{path}")
    }
}

#[async_trait]
impl GenerationProvider for OllamaClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let url = self.endpoint("/api/chat");
        let payload = OllamaChatRequest::from(&request);
        info!(
            model = request.model.as_str(),
            url = %url,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending request to generation engine"
        );
        let response: OllamaChatResponse = self
            .http
            .post(url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Received response from generation engine");

        let message = response
            .message
            .ok_or_else(|| GenerationError::InvalidResponse("missing message field".into()))?;

        Ok(GenerationResponse {
            content: message.content,
        })
    }
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<OllamaToolDeclaration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
    options: OllamaOptions,
}

impl From<&GenerationRequest> for OllamaChatRequest {
    fn from(value: &GenerationRequest) -> Self {
        Self {
            model: value.model.clone(),
            messages: value
                .messages
                .iter()
                .map(|msg| OllamaChatMessage {
                    role: msg.role.as_str().to_string(),
                    content: msg.content.clone(),
                })
                .collect(),
            stream: false,
            tools: value
                .tools
                .iter()
                .map(|schema| OllamaToolDeclaration {
                    kind: "function",
                    function: schema.clone(),
                })
                .collect(),
            think: value.thinking.then_some(true),
            options: OllamaOptions {
                temperature: value.sampling.temperature,
                top_p: value.sampling.top_p,
                top_k: value.sampling.top_k,
                repeat_penalty: value.sampling.repeat_penalty,
                num_predict: value.sampling.max_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OllamaToolDeclaration {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolSchema,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    repeat_penalty: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageRole;
    use serde_json::json;

    #[test]
    fn endpoint_joins_paths_correctly() {
        let client = OllamaClient::new("http://localhost:11434/");
        assert_eq!(
            client.endpoint("/api/chat"),
            "http://localhost:11434/api/chat"
        );
    }

    #[test]
    fn request_conversion_preserves_roles_and_tools() {
        let request = GenerationRequest {
            model: "qwen3:1.7b".into(),
            messages: vec![
                ChatMessage::new(MessageRole::System, "stay concise"),
                ChatMessage::new(MessageRole::User, "hi"),
            ],
            tools: vec![ToolSchema {
                name: "calculate".into(),
                description: "Calculate a mathematical expression.".into(),
                parameters: json!({"type": "object"}),
            }],
            sampling: SamplingConfig::default(),
            thinking: false,
        };
        let payload = OllamaChatRequest::from(&request);
        let roles: Vec<_> = payload.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user"]);
        assert_eq!(payload.tools.len(), 1);
        assert_eq!(payload.tools[0].function.name, "calculate");
        assert_eq!(payload.think, None);
    }

    #[test]
    fn thinking_flag_is_forwarded() {
        let request = GenerationRequest {
            model: "qwen3:1.7b".into(),
            messages: Vec::new(),
            tools: Vec::new(),
            sampling: SamplingConfig::default(),
            thinking: true,
        };
        let payload = OllamaChatRequest::from(&request);
        assert_eq!(payload.think, Some(true));
    }
}
