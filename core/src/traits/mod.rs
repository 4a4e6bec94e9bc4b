pub mod message;
pub mod provider;
pub mod tool;

pub use message::{ContentPart, Message, MessageContent, Role, ToolCall};
pub use provider::{ChatRequest, ChatResponse, Provider};
pub use tool::{Tool, ToolErrorKind, ToolOutcome, ToolSpec};
