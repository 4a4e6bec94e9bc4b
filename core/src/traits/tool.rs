use crate::agent::RunContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Why a tool invocation produced an error payload instead of output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    ExecutionError,
}

/// The payload appended to the conversation as a tool-result message.
/// Errors are part of the payload, not of the loop's control flow: the
/// model sees them and decides how to proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,
}

impl ToolOutcome {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
            error_kind: None,
        }
    }

    pub fn error(kind: ToolErrorKind, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
            error_kind: Some(kind),
        }
    }

    /// Wire form fed back to the model.
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"success\":false}".to_string())
    }
}

/// Descriptor advertised to the model: name, applicability description,
/// and a JSON object schema for the arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> serde_json::Value;

    /// Runs the tool with arguments already validated against
    /// `parameters_schema`. `ctx` carries caller-scoped data such as a
    /// user id. Returning `Err` is equivalent to returning an
    /// execution-error outcome; the registry converts it.
    async fn invoke(
        &self,
        args: serde_json::Value,
        ctx: &RunContext,
    ) -> anyhow::Result<ToolOutcome>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters_schema: self.parameters_schema(),
        }
    }
}
