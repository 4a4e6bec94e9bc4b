use crate::error::AgentError;
use crate::traits::{Message, ToolCall, ToolSpec};
use async_trait::async_trait;

/// One completion request: the conversation so far plus the tools the
/// model may call. Borrowed; providers convert to their wire format.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Message],
    pub tools: Option<&'a [ToolSpec]>,
}

/// What the model answered: free text, tool-call requests, or both.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl ChatResponse {
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// A chat-completion backend. Implementations must be safe to call from
/// concurrent invocations; the loop holds them behind `Arc`.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatResponse, AgentError>;

    fn name(&self) -> &str;
}
