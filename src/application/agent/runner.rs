use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::model::{GenerationProvider, GenerationRequest};
use crate::tooling::ToolRegistry;
use crate::types::{CallMetadata, ChatMessage, Conversation};

use super::composer::{self, InvalidCall};
use super::errors::AgentError;
use super::models::{AgentOptions, AgentOutcome, AgentStep, ContinuationPolicy, TerminationReason};
use super::runtime::{DispatchResult, ToolRuntime, parser};

/// The orchestration loop: generate, scan for a directive, dispatch it,
/// fold the result back in, and finalize once no call is pending.
///
/// One turn walks GENERATING → PARSING → {DISPATCHING, FINALIZING}; a
/// dispatched call re-enters GENERATING so the engine sees the tool result.
/// The turn is strictly sequential; nothing here is re-entrant. The registry
/// is read-only and shared, so independent conversations may run turns
/// concurrently, each owning its own `Conversation`.
pub struct Agent<P: GenerationProvider> {
    provider: Arc<P>,
    runtime: ToolRuntime,
}

impl<P: GenerationProvider> Agent<P> {
    pub fn new(provider: Arc<P>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            runtime: ToolRuntime::new(registry),
        }
    }

    /// Runs one turn to termination and returns the full history, whose
    /// final message is the composed answer.
    ///
    /// Only a generation fault escapes, and it aborts the turn before the
    /// conversation advances past the failed call; the caller decides
    /// whether to retract the in-flight user message. Every tool-side
    /// failure is folded back into the conversation as data.
    pub async fn run(
        &self,
        mut conversation: Conversation,
        options: AgentOptions,
    ) -> Result<AgentOutcome, AgentError> {
        info!(model = options.model.as_str(), "Agent turn started");
        let schemas = self.runtime.schemas();
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut invalid_call: Option<InvalidCall> = None;
        let mut termination = TerminationReason::Completed;
        let mut iterations = 0usize;

        loop {
            if iterations >= options.max_steps {
                warn!(
                    max_steps = options.max_steps,
                    "Iteration cap reached, terminating turn"
                );
                termination = TerminationReason::MaxIterations;
                break;
            }
            iterations += 1;
            debug!(iteration = iterations, "Generating continuation");

            let request = GenerationRequest {
                model: options.model.clone(),
                messages: conversation.iter().cloned().collect(),
                tools: schemas.clone(),
                sampling: options.sampling.clone(),
                thinking: options.thinking,
            };
            let response = match options.step_timeout {
                Some(limit) => tokio::time::timeout(limit, self.provider.generate(request))
                    .await
                    .map_err(|_| AgentError::GenerationTimeout {
                        seconds: limit.as_secs(),
                    })??,
                None => self.provider.generate(request).await?,
            };
            conversation.push(ChatMessage::assistant(response.content.clone()));

            let directive = match parser::parse_directive(&response.content) {
                Ok(None) => {
                    debug!("No directive in response, finalizing");
                    break;
                }
                Err(error) => {
                    warn!(%error, "Directive payload failed to decode, finalizing");
                    invalid_call = Some(InvalidCall::Decode(error.to_string()));
                    break;
                }
                Ok(Some(directive)) => directive,
            };

            let metadata = CallMetadata {
                tool_name: directive.name.clone().unwrap_or_default(),
                arguments: directive.arguments.clone().unwrap_or_default(),
            };
            let (content, success) = match self
                .runtime
                .dispatch(&directive, options.step_timeout)
                .await
            {
                DispatchResult::MissingArguments => {
                    warn!("Directive lacked a tool name or arguments, finalizing");
                    invalid_call = Some(InvalidCall::MissingArguments);
                    break;
                }
                DispatchResult::Success(content) => (content, true),
                DispatchResult::ToolNotFound => (
                    format!(
                        "Error: no tool named \"{}\" is registered.",
                        metadata.tool_name
                    ),
                    false,
                ),
                DispatchResult::InvocationFailed(message) => (
                    format!("Error executing tool {}: {message}", metadata.tool_name),
                    false,
                ),
            };

            conversation.push(ChatMessage::tool_result(content.clone(), metadata.clone()));
            steps.push(AgentStep {
                tool: metadata.tool_name.clone(),
                arguments: metadata.arguments,
                success,
                output: content.clone(),
            });

            if options.continuation == ContinuationPolicy::Summarize {
                conversation.push(ChatMessage::user(summarize_nudge(
                    &metadata.tool_name,
                    &content,
                )));
            }
        }

        let response = composer::finalize(&mut conversation, invalid_call.as_ref(), termination);
        info!(
            ?termination,
            steps = steps.len(),
            "Agent turn finalized"
        );
        Ok(AgentOutcome {
            conversation,
            response,
            steps,
            termination,
        })
    }
}

fn summarize_nudge(tool_name: &str, tool_response: &str) -> String {
    format!(
        "The tool `{tool_name}` has responded with the following data:\n\n{tool_response}\n\nPlease summarize this result and continue your answer for the user."
    )
}
