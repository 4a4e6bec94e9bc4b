use crate::traits::Message;
use thiserror::Error;

/// Failures that end an invocation of the agent loop.
///
/// Tool-level problems (unknown tool, bad arguments, handler failure) are
/// not represented here: they are fed back to the model as tool-result
/// messages and never surface as an `Err`.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("provider transport failure: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    Provider(String),

    #[error("no final answer within {limit} iterations")]
    IterationLimit { limit: usize },

    #[error("run cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for AgentError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AgentError::Provider(e.to_string())
        } else {
            AgentError::Transport(e.to_string())
        }
    }
}

/// A fatal loop outcome together with the messages accumulated up to the
/// point of failure, so callers can inspect or persist the partial run.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error: AgentError,
    pub messages: Vec<Message>,
}

impl RunFailure {
    pub fn new(error: AgentError, messages: Vec<Message>) -> Self {
        Self { error, messages }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error, AgentError::Cancelled)
    }
}
