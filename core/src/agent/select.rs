use crate::traits::{Message, Provider};
use std::sync::Arc;

type SelectFn = dyn Fn(&[Message]) -> Option<Arc<dyn Provider>> + Send + Sync;

/// How the provider for each model call is chosen: the loop's configured
/// provider, or a function of the message sequence so far. The function
/// returns `None` to keep the configured provider for that call.
pub enum ProviderSelect {
    Default,
    Dynamic(Box<SelectFn>),
}

impl ProviderSelect {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&[Message]) -> Option<Arc<dyn Provider>> + Send + Sync + 'static,
    {
        ProviderSelect::Dynamic(Box::new(f))
    }

    /// Escalates to `advanced` once the sequence has grown past
    /// `threshold` messages; shorter conversations stay on the
    /// configured provider.
    pub fn escalate_past(threshold: usize, advanced: Arc<dyn Provider>) -> Self {
        ProviderSelect::dynamic(move |messages| {
            (messages.len() > threshold).then(|| advanced.clone())
        })
    }

    pub fn select(&self, default: &Arc<dyn Provider>, messages: &[Message]) -> Arc<dyn Provider> {
        match self {
            ProviderSelect::Default => Arc::clone(default),
            ProviderSelect::Dynamic(f) => f(messages).unwrap_or_else(|| Arc::clone(default)),
        }
    }
}

impl std::fmt::Debug for ProviderSelect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderSelect::Default => f.write_str("Default"),
            ProviderSelect::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;

    fn provider() -> Arc<dyn Provider> {
        Arc::new(MockProvider::scripted(vec![]))
    }

    #[test]
    fn default_keeps_the_configured_provider() {
        let configured = provider();
        let select = ProviderSelect::Default;
        let chosen = select.select(&configured, &[Message::user("hi")]);
        assert!(Arc::ptr_eq(&chosen, &configured));
    }

    #[test]
    fn escalation_switches_past_the_threshold() {
        let basic = provider();
        let advanced = provider();
        let select = ProviderSelect::escalate_past(3, advanced.clone());

        let mut messages = vec![Message::system("s"), Message::user("u")];
        assert!(Arc::ptr_eq(&select.select(&basic, &messages), &basic));

        messages.push(Message::assistant("a"));
        messages.push(Message::user("u2"));
        assert!(Arc::ptr_eq(&select.select(&basic, &messages), &advanced));
    }
}
