//! JSON-lines stdio front end: one request object per input line, one
//! response object per output line.

use crate::agent::{AgentStep, TerminationReason};
use crate::client::{ChatClient, ChatRequest};
use crate::model::GenerationProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum StdioError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize stdio response: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct StdioChatRequest {
    prompt: String,
    model: Option<String>,
    system_prompt: Option<String>,
    session_id: Option<String>,
    #[serde(default)]
    max_tool_steps: Option<usize>,
}

#[derive(Debug, Serialize)]
struct StdioChatResponse {
    session_id: Option<String>,
    content: Option<String>,
    error: Option<String>,
    termination: Option<TerminationReason>,
    tool_steps: Vec<AgentStep>,
}

impl StdioChatResponse {
    fn success(
        session_id: String,
        content: String,
        termination: TerminationReason,
        tool_steps: Vec<AgentStep>,
    ) -> Self {
        Self {
            session_id: Some(session_id),
            content: Some(content),
            error: None,
            termination: Some(termination),
            tool_steps,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            session_id: None,
            content: None,
            error: Some(message.into()),
            termination: None,
            tool_steps: Vec::new(),
        }
    }
}

pub async fn run<P>(client: Arc<ChatClient<P>>) -> Result<(), StdioError>
where
    P: GenerationProvider + 'static,
{
    let stdin = BufReader::new(io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("Received STDIO line");

        match serde_json::from_str::<StdioChatRequest>(&line) {
            Ok(request) => {
                if request.prompt.trim().is_empty() {
                    write_response(
                        &mut stdout,
                        StdioChatResponse::error("prompt cannot be empty"),
                    )
                    .await?;
                    continue;
                }

                info!("Processing STDIO chat request");
                let mut chat_request = ChatRequest::prompt(request.prompt);
                chat_request.model = request.model;
                chat_request.system_prompt = request.system_prompt;
                chat_request.session_id = request.session_id;
                chat_request.max_tool_steps = request.max_tool_steps;

                match client.chat(chat_request).await {
                    Ok(result) => {
                        write_response(
                            &mut stdout,
                            StdioChatResponse::success(
                                result.session_id,
                                result.content,
                                result.termination,
                                result.steps,
                            ),
                        )
                        .await?;
                    }
                    Err(err) => {
                        error!(%err, "STDIO chat request failed");
                        write_response(&mut stdout, StdioChatResponse::error(err.user_message()))
                            .await?;
                    }
                }
            }
            Err(err) => {
                error!(%err, "Failed to parse STDIO input line");
                write_response(
                    &mut stdout,
                    StdioChatResponse::error(format!("invalid JSON input: {err}")),
                )
                .await?;
            }
        }
    }

    stdout.flush().await?;
    Ok(())
}

async fn write_response(
    stdout: &mut io::Stdout,
    response: StdioChatResponse,
) -> Result<(), StdioError> {
    let mut payload = serde_json::to_vec(&response)?;
    payload.push(b'\n');
    stdout.write_all(&payload).await?;
    stdout.flush().await?;
    Ok(())
}
