use crate::error::AgentError;
use serde_json::Value;

/// Opaque caller-scoped data for one invocation: available to dynamic
/// prompt computation and to tools that need it (a user id, a role).
/// The loop never interprets it.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    value: Value,
}

impl RunContext {
    pub fn empty() -> Self {
        Self { value: Value::Null }
    }

    pub fn new(value: Value) -> Self {
        Self { value }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_null()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(|v| v.as_str())
    }

    /// Like [`get_str`](Self::get_str) but a missing field is a
    /// configuration error, for prompt functions with hard requirements.
    pub fn require_str(&self, key: &str) -> Result<&str, AgentError> {
        self.get_str(key).ok_or_else(|| {
            AgentError::Configuration(format!("context is missing required field '{}'", key))
        })
    }
}

impl From<Value> for RunContext {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
