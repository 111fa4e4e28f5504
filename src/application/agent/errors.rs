use crate::model::GenerationError;
use thiserror::Error;

/// Faults that escape the loop. Tool and directive failures never appear
/// here; they are folded back into the conversation as data.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("generation did not complete within {seconds}s")]
    GenerationTimeout { seconds: u64 },
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Generation(err) => err.user_message(),
            AgentError::GenerationTimeout { seconds } => format!(
                "The generation engine did not answer within {seconds} seconds. Try again or raise the step timeout."
            ),
        }
    }
}
