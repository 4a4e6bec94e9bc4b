pub mod agent;
pub mod config;
pub mod error;
pub mod providers;
pub mod schema;
pub mod tools;
pub mod traits;

pub use agent::{AgentLoop, AgentRun, RunContext, SystemPrompt, ToolRegistry};
pub use config::*;
pub use error::{AgentError, RunFailure};
pub use providers::*;
pub use tools::*;
pub use traits::*;
