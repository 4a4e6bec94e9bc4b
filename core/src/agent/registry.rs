use crate::agent::RunContext;
use crate::schema::validate_arguments;
use crate::traits::{Tool, ToolErrorKind, ToolOutcome, ToolSpec};
use anyhow::{Result, bail};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Name-keyed set of tools. Populated during setup, read-only from the
/// loop's point of view afterwards; safe to share across invocations.
pub struct ToolRegistry {
    tools: Mutex<HashMap<String, Arc<dyn Tool>>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, tool: Box<dyn Tool>) -> Result<()> {
        let mut tools = self.tools.lock().unwrap();
        let name = tool.name().to_string();
        if tools.contains_key(&name) {
            bail!("tool '{}' is already registered", name);
        }
        tools.insert(name, Arc::from(tool));
        Ok(())
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        let tools = self.tools.lock().unwrap();
        let mut specs: Vec<ToolSpec> = tools.values().map(|t| t.spec()).collect();
        // Stable order so identical runs present identical descriptors.
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.lock().unwrap().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.lock().unwrap().is_empty()
    }

    /// Resolves, validates, and invokes one tool call. Never returns an
    /// error: every failure mode becomes an error outcome the model can
    /// read and react to.
    pub async fn execute(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &RunContext,
    ) -> ToolOutcome {
        let tool = {
            let tools = self.tools.lock().unwrap();
            tools.get(name).cloned()
        };

        let Some(tool) = tool else {
            return ToolOutcome::error(
                ToolErrorKind::UnknownTool,
                format!("no tool named '{}' is registered", name),
            );
        };

        let args = match validate_arguments(&tool.parameters_schema(), &args) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "rejected tool arguments");
                return ToolOutcome::error(ToolErrorKind::InvalidArguments, e.to_string());
            }
        };

        match tool.invoke(args, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool invocation failed");
                ToolOutcome::error(ToolErrorKind::ExecutionError, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the given text back"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }

        async fn invoke(
            &self,
            args: serde_json::Value,
            _ctx: &RunContext,
        ) -> anyhow::Result<ToolOutcome> {
            Ok(ToolOutcome::success(
                args["text"].as_str().unwrap_or_default(),
            ))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always fails"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({ "type": "object", "properties": {} })
        }

        async fn invoke(
            &self,
            _args: serde_json::Value,
            _ctx: &RunContext,
        ) -> anyhow::Result<ToolOutcome> {
            anyhow::bail!("wire snapped")
        }
    }

    #[test]
    fn duplicate_registration_rejected() {
        let registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        assert!(registry.register(Box::new(EchoTool)).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_outcome() {
        let registry = ToolRegistry::new();
        let outcome = registry
            .execute("missing", json!({}), &RunContext::empty())
            .await;
        assert_eq!(outcome.error_kind, Some(ToolErrorKind::UnknownTool));
    }

    #[tokio::test]
    async fn invalid_arguments_become_error_outcome() {
        let registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let outcome = registry
            .execute("echo", json!({}), &RunContext::empty())
            .await;
        assert_eq!(outcome.error_kind, Some(ToolErrorKind::InvalidArguments));
    }

    #[tokio::test]
    async fn handler_error_becomes_error_outcome() {
        let registry = ToolRegistry::new();
        registry.register(Box::new(FailingTool)).unwrap();
        let outcome = registry
            .execute("broken", json!({}), &RunContext::empty())
            .await;
        assert_eq!(outcome.error_kind, Some(ToolErrorKind::ExecutionError));
        assert!(outcome.error.as_deref().unwrap().contains("wire snapped"));
    }

    #[tokio::test]
    async fn successful_invocation_passes_output_through() {
        let registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let outcome = registry
            .execute("echo", json!({ "text": "hi" }), &RunContext::empty())
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.output, "hi");
    }
}
