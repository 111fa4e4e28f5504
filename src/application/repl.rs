//! Interactive terminal conversation front end.

use crate::client::{ChatClient, ChatRequest};
use crate::model::GenerationProvider;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::error;

const STEP_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn run<P>(client: Arc<ChatClient<P>>) -> Result<(), ReplError>
where
    P: GenerationProvider + 'static,
{
    let stdin = BufReader::new(io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = io::stdout();

    stdout
        .write_all(b"--- Start Conversation (type 'exit' to quit) ---\n")
        .await?;

    let mut session_id: Option<String> = None;
    loop {
        stdout.write_all(b"User: ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }
        if prompt.eq_ignore_ascii_case("exit") {
            stdout.write_all(b"Exiting conversation.\n").await?;
            break;
        }

        let mut request = ChatRequest::prompt(prompt);
        request.session_id = session_id.clone();
        match client.chat(request).await {
            Ok(result) => {
                session_id = Some(result.session_id.clone());
                for step in &result.steps {
                    let arguments = serde_json::to_string(&Value::Object(step.arguments.clone()))
                        .unwrap_or_else(|_| "{}".to_string());
                    let line = format!(
                        "[tool] {}({}) -> {}\n",
                        step.tool,
                        arguments,
                        preview(&step.output)
                    );
                    stdout.write_all(line.as_bytes()).await?;
                }
                let answer = format!("\nAssistant:\n{}\n{}\n", result.content, "-".repeat(20));
                stdout.write_all(answer.as_bytes()).await?;
            }
            Err(err) => {
                // The failed user message was never persisted; the session
                // continues from its previous state.
                error!(%err, "Turn failed");
                let notice = format!(
                    "\nAn error occurred during the turn: {}\n",
                    err.user_message()
                );
                stdout.write_all(notice.as_bytes()).await?;
            }
        }
    }

    stdout.flush().await?;
    Ok(())
}

fn preview(output: &str) -> String {
    if output.chars().count() <= STEP_PREVIEW_CHARS {
        return output.to_string();
    }
    let truncated: String = output.chars().take(STEP_PREVIEW_CHARS).collect();
    format!("{truncated}…")
}
