use crate::agent::RunContext;
use crate::error::AgentError;

type PromptFn = dyn Fn(&RunContext) -> Result<String, AgentError> + Send + Sync;

/// How the effective system prompt is obtained: a fixed string, or a
/// function of the per-invocation context. A failing function fails the
/// whole invocation before the first model call.
pub enum SystemPrompt {
    Static(String),
    Dynamic(Box<PromptFn>),
}

impl SystemPrompt {
    pub fn fixed(prompt: impl Into<String>) -> Self {
        SystemPrompt::Static(prompt.into())
    }

    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&RunContext) -> Result<String, AgentError> + Send + Sync + 'static,
    {
        SystemPrompt::Dynamic(Box::new(f))
    }

    pub fn compute(&self, ctx: &RunContext) -> Result<String, AgentError> {
        match self {
            SystemPrompt::Static(s) => Ok(s.clone()),
            SystemPrompt::Dynamic(f) => f(ctx),
        }
    }
}

impl std::fmt::Debug for SystemPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SystemPrompt::Static(s) => f.debug_tuple("Static").field(s).finish(),
            SystemPrompt::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

const BASE_PROMPT: &str = "You are a helpful assistant. Provide clear and concise answers.";

/// Adapts the assistant's register to the `user_role` context field.
/// Unknown or absent roles fall back to the base prompt.
pub fn role_adapted_prompt(ctx: &RunContext) -> Result<String, AgentError> {
    let prompt = match ctx.get_str("user_role") {
        Some("expert") => format!(
            "{} As an expert user, provide detailed and technical explanations.",
            BASE_PROMPT
        ),
        Some("beginner") => format!(
            "{} As a beginner user, provide simple and easy-to-understand explanations.",
            BASE_PROMPT
        ),
        Some("child") => format!(
            "{} Explain everything as if you are talking to a five-year old child, \
             using simple language and examples.",
            BASE_PROMPT
        ),
        _ => BASE_PROMPT.to_string(),
    };
    Ok(prompt)
}
