use crate::error::AgentError;
use crate::traits::{ChatRequest, ChatResponse, Provider};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted provider for tests: returns pre-configured responses in
/// order, optionally repeating a fallback forever. Counts calls so tests
/// can assert how often the loop consulted the model.
pub struct MockProvider {
    script: Mutex<Vec<ChatResponse>>,
    fallback: Option<ChatResponse>,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Responds with each element once, then fails.
    pub fn scripted(responses: Vec<ChatResponse>) -> Self {
        Self {
            script: Mutex::new(responses),
            fallback: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Responds with the same response on every call.
    pub fn always(response: ChatResponse) -> Self {
        Self {
            script: Mutex::new(Vec::new()),
            fallback: Some(response),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, _request: ChatRequest<'_>) -> Result<ChatResponse, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            self.fallback
                .clone()
                .ok_or_else(|| AgentError::Provider("mock script exhausted".to_string()))
        } else {
            Ok(script.remove(0))
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
