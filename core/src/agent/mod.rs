pub mod context;
pub mod loop_;
pub mod prompt;
pub mod registry;
pub mod select;

pub use context::RunContext;
pub use loop_::{AgentLoop, AgentRun};
pub use prompt::{SystemPrompt, role_adapted_prompt};
pub use registry::ToolRegistry;
pub use select::ProviderSelect;
