use crate::agent::{ProviderSelect, RunContext, SystemPrompt, ToolRegistry};
use crate::error::{AgentError, RunFailure};
use crate::traits::{ChatRequest, Message, Provider, Role, ToolErrorKind, ToolOutcome};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const DEFAULT_MAX_ITERATIONS: usize = 10;

/// A finished invocation: the final assistant message plus the complete
/// accumulated sequence, which callers may persist and feed back as the
/// `initial_messages` of a follow-up call.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRun {
    pub final_message: Message,
    pub messages: Vec<Message>,
}

/// The tool-augmented agent loop. Construction fixes the provider, the
/// registry, the system prompt, and the iteration bound; the value is
/// stateless across invocations and safe to share.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    registry: Arc<ToolRegistry>,
    system_prompt: SystemPrompt,
    provider_select: ProviderSelect,
    max_iterations: usize,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            registry,
            system_prompt: SystemPrompt::fixed("You are a helpful assistant."),
            provider_select: ProviderSelect::Default,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_system_prompt(mut self, prompt: SystemPrompt) -> Self {
        self.system_prompt = prompt;
        self
    }

    /// Re-picks the provider before every model call from the sequence
    /// so far, e.g. escalating to a stronger model as the conversation
    /// grows.
    pub fn with_provider_select(mut self, select: ProviderSelect) -> Self {
        self.provider_select = select;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Runs one invocation to completion without external cancellation.
    pub async fn run(
        &self,
        initial_messages: Vec<Message>,
        ctx: &RunContext,
    ) -> Result<AgentRun, RunFailure> {
        self.run_cancellable(initial_messages, ctx, CancellationToken::new())
            .await
    }

    /// Runs one invocation, checking `cancel` at the top of every
    /// iteration and before every individual tool invocation. On
    /// cancellation the partial sequence is returned in the failure.
    pub async fn run_cancellable(
        &self,
        initial_messages: Vec<Message>,
        ctx: &RunContext,
        cancel: CancellationToken,
    ) -> Result<AgentRun, RunFailure> {
        let mut messages = match self.prepare(initial_messages, ctx) {
            Ok(messages) => messages,
            Err((error, messages)) => return Err(RunFailure::new(error, messages)),
        };

        let specs = self.registry.specs();

        for iteration in 1..=self.max_iterations {
            if cancel.is_cancelled() {
                return Err(RunFailure::new(AgentError::Cancelled, messages));
            }

            let provider = self.provider_select.select(&self.provider, &messages);
            let request = ChatRequest {
                messages: &messages,
                tools: if specs.is_empty() { None } else { Some(&specs) },
            };

            let response = match provider.complete(request).await {
                Ok(response) => response,
                Err(error) => return Err(RunFailure::new(error, messages)),
            };

            debug!(
                iteration,
                tool_calls = response.tool_calls.len(),
                "provider responded"
            );

            if !response.has_tool_calls() {
                let final_message = Message::assistant(response.text.unwrap_or_default());
                messages.push(final_message.clone());
                return Ok(AgentRun {
                    final_message,
                    messages,
                });
            }

            let tool_calls = response.tool_calls;
            messages.push(Message::assistant_with_tool_calls(
                response.text.unwrap_or_default(),
                tool_calls.clone(),
            ));

            // Requests are executed in the order the model returned them
            // so side effects on shared external resources reproduce.
            for call in tool_calls {
                if cancel.is_cancelled() {
                    return Err(RunFailure::new(AgentError::Cancelled, messages));
                }

                let outcome = match serde_json::from_str(&call.arguments) {
                    Ok(args) => self.registry.execute(&call.name, args, ctx).await,
                    Err(e) => ToolOutcome::error(
                        ToolErrorKind::InvalidArguments,
                        format!("arguments are not valid JSON: {}", e),
                    ),
                };

                messages.push(Message::tool_result(call.id, call.name, outcome.to_payload()));
            }
        }

        Err(RunFailure::new(
            AgentError::IterationLimit {
                limit: self.max_iterations,
            },
            messages,
        ))
    }

    /// Validates the initial sequence and prepends the effective system
    /// message unless the caller already supplied one.
    fn prepare(
        &self,
        initial_messages: Vec<Message>,
        ctx: &RunContext,
    ) -> Result<Vec<Message>, (AgentError, Vec<Message>)> {
        if initial_messages.is_empty() {
            return Err((
                AgentError::Configuration("initial messages must not be empty".to_string()),
                initial_messages,
            ));
        }

        let first_role = initial_messages
            .iter()
            .find(|m| m.role != Role::System)
            .map(|m| m.role);
        match first_role {
            Some(Role::User) => {}
            Some(role) => {
                return Err((
                    AgentError::Configuration(format!(
                        "first non-system message must be from the user, got {:?}",
                        role
                    )),
                    initial_messages,
                ));
            }
            None => {
                return Err((
                    AgentError::Configuration(
                        "initial messages contain no user message".to_string(),
                    ),
                    initial_messages,
                ));
            }
        }

        let mut messages = initial_messages;
        if messages.first().is_none_or(|m| m.role != Role::System) {
            let prompt = match self.system_prompt.compute(ctx) {
                Ok(prompt) => prompt,
                Err(error) => return Err((error, messages)),
            };
            messages.insert(0, Message::system(prompt));
        }

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockProvider;
    use crate::traits::{ChatResponse, Tool, ToolCall};
    use async_trait::async_trait;
    use serde_json::json;

    struct LookupTool;

    #[async_trait]
    impl Tool for LookupTool {
        fn name(&self) -> &str {
            "lookup"
        }

        fn description(&self) -> &str {
            "Look up the current temperature for a city"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            })
        }

        async fn invoke(
            &self,
            args: serde_json::Value,
            _ctx: &RunContext,
        ) -> anyhow::Result<ToolOutcome> {
            assert_eq!(args["city"], "Paris");
            Ok(ToolOutcome::success(json!({ "temp": 18 }).to_string()))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "lookup"
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
            anyhow::bail!("backend unreachable")
        }
    }

    fn text_response(text: &str) -> ChatResponse {
        ChatResponse {
            text: Some(text.to_string()),
            tool_calls: vec![],
        }
    }

    fn lookup_paris_response() -> ChatResponse {
        ChatResponse {
            text: None,
            tool_calls: vec![ToolCall {
                id: "call_1".to_string(),
                name: "lookup".to_string(),
                arguments: json!({ "city": "Paris" }).to_string(),
            }],
        }
    }

    fn loop_with(provider: &Arc<MockProvider>, registry: ToolRegistry) -> AgentLoop {
        AgentLoop::new(provider.clone(), Arc::new(registry))
    }

    #[tokio::test]
    async fn immediate_answer_takes_one_provider_call() {
        let provider = Arc::new(MockProvider::scripted(vec![text_response("4")]));
        let agent = loop_with(&provider, ToolRegistry::new());

        let initial = vec![
            Message::system("You are a helpful assistant."),
            Message::user("2+2?"),
        ];
        let run = agent.run(initial, &RunContext::empty()).await.unwrap();

        assert_eq!(provider.calls(), 1);
        assert_eq!(run.final_message.content.as_text(), Some("4"));
        assert_eq!(run.messages.len(), 3);
        // Caller-supplied system message is kept, not duplicated.
        assert_eq!(run.messages[0].role, Role::System);
        assert_eq!(run.messages[1].role, Role::User);
    }

    #[tokio::test]
    async fn tool_round_trip_pairs_request_with_result() {
        let provider = Arc::new(MockProvider::scripted(vec![
            lookup_paris_response(),
            text_response("18°C in Paris"),
        ]));
        let registry = ToolRegistry::new();
        registry.register(Box::new(LookupTool)).unwrap();
        let agent = loop_with(&provider, registry);

        let run = agent
            .run(
                vec![Message::user("Weather in Paris?")],
                &RunContext::empty(),
            )
            .await
            .unwrap();

        assert_eq!(provider.calls(), 2);
        // system, user, assistant tool call, tool result, final assistant
        assert_eq!(run.messages.len(), 5);
        assert_eq!(run.messages[2].tool_calls.as_ref().unwrap()[0].id, "call_1");
        assert_eq!(run.messages[3].role, Role::Tool);
        assert_eq!(run.messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert!(run.messages[3].content.to_text_lossy().contains("18"));
        assert_eq!(
            run.final_message.content.as_text(),
            Some("18°C in Paris")
        );
    }

    #[tokio::test]
    async fn failing_handler_is_fed_back_until_iteration_limit() {
        let provider = Arc::new(MockProvider::always(lookup_paris_response()));
        let registry = ToolRegistry::new();
        registry.register(Box::new(BrokenTool)).unwrap();
        let agent = loop_with(&provider, registry).with_max_iterations(3);

        let failure = agent
            .run(vec![Message::user("Weather?")], &RunContext::empty())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            AgentError::IterationLimit { limit: 3 }
        ));
        assert_eq!(provider.calls(), 3);

        let tool_results: Vec<_> = failure
            .messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect();
        assert_eq!(tool_results.len(), 3);
        for result in tool_results {
            let payload: ToolOutcome =
                serde_json::from_str(result.content.as_text().unwrap()).unwrap();
            assert_eq!(payload.error_kind, Some(ToolErrorKind::ExecutionError));
            assert!(payload.error.unwrap().contains("backend unreachable"));
        }
    }

    #[tokio::test]
    async fn unknown_tool_does_not_terminate_the_invocation() {
        let provider = Arc::new(MockProvider::scripted(vec![
            lookup_paris_response(),
            text_response("That tool is unavailable, sorry."),
        ]));
        let agent = loop_with(&provider, ToolRegistry::new());

        let run = agent
            .run(vec![Message::user("Weather?")], &RunContext::empty())
            .await
            .unwrap();

        let payload: ToolOutcome =
            serde_json::from_str(run.messages[3].content.as_text().unwrap()).unwrap();
        assert_eq!(payload.error_kind, Some(ToolErrorKind::UnknownTool));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn identical_inputs_yield_identical_sequences() {
        let run = |_: usize| async {
            let provider = Arc::new(MockProvider::scripted(vec![
                lookup_paris_response(),
                text_response("18°C in Paris"),
            ]));
            let registry = ToolRegistry::new();
            registry.register(Box::new(LookupTool)).unwrap();
            loop_with(&provider, registry)
                .run(
                    vec![Message::user("Weather in Paris?")],
                    &RunContext::empty(),
                )
                .await
                .unwrap()
        };

        let first = run(0).await;
        let second = run(1).await;
        assert_eq!(first.messages, second.messages);
        assert_eq!(first.final_message, second.final_message);
    }

    #[tokio::test]
    async fn iteration_limit_counts_provider_calls_exactly() {
        let provider = Arc::new(MockProvider::always(lookup_paris_response()));
        let registry = ToolRegistry::new();
        registry.register(Box::new(LookupTool)).unwrap();
        let agent = loop_with(&provider, registry).with_max_iterations(2);

        let failure = agent
            .run(vec![Message::user("Weather?")], &RunContext::empty())
            .await
            .unwrap_err();

        assert!(matches!(
            failure.error,
            AgentError::IterationLimit { limit: 2 }
        ));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn cancellation_is_observed_before_the_first_call() {
        let provider = Arc::new(MockProvider::scripted(vec![text_response("never")]));
        let agent = loop_with(&provider, ToolRegistry::new());

        let token = CancellationToken::new();
        token.cancel();
        let failure = agent
            .run_cancellable(vec![Message::user("hi")], &RunContext::empty(), token)
            .await
            .unwrap_err();

        assert!(failure.is_cancelled());
        assert_eq!(provider.calls(), 0);
        // The prepared partial sequence is surfaced for diagnostics.
        assert_eq!(failure.messages.last().unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn empty_initial_messages_are_a_configuration_error() {
        let provider = Arc::new(MockProvider::scripted(vec![]));
        let agent = loop_with(&provider, ToolRegistry::new());

        let failure = agent.run(vec![], &RunContext::empty()).await.unwrap_err();
        assert!(matches!(failure.error, AgentError::Configuration(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn first_non_system_message_must_be_from_the_user() {
        let provider = Arc::new(MockProvider::scripted(vec![]));
        let agent = loop_with(&provider, ToolRegistry::new());

        let failure = agent
            .run(
                vec![Message::system("s"), Message::assistant("hello")],
                &RunContext::empty(),
            )
            .await
            .unwrap_err();
        assert!(matches!(failure.error, AgentError::Configuration(_)));
    }

    #[tokio::test]
    async fn failing_prompt_function_fails_before_any_call() {
        let provider = Arc::new(MockProvider::scripted(vec![text_response("never")]));
        let agent = loop_with(&provider, ToolRegistry::new()).with_system_prompt(
            SystemPrompt::dynamic(|ctx| {
                let id = ctx.require_str("user_id")?;
                Ok(format!("You assist {}.", id))
            }),
        );

        let failure = agent
            .run(vec![Message::user("hi")], &RunContext::empty())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, AgentError::Configuration(_)));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn system_prompt_is_prepended_when_absent() {
        let provider = Arc::new(MockProvider::scripted(vec![text_response("ok")]));
        let agent = loop_with(&provider, ToolRegistry::new())
            .with_system_prompt(SystemPrompt::fixed("You are a Pokedex."));

        let run = agent
            .run(vec![Message::user("hi")], &RunContext::empty())
            .await
            .unwrap();

        assert_eq!(run.messages[0].role, Role::System);
        assert_eq!(
            run.messages[0].content.as_text(),
            Some("You are a Pokedex.")
        );
    }

    #[tokio::test]
    async fn long_conversations_escalate_to_the_advanced_provider() {
        let basic = Arc::new(MockProvider::scripted(vec![lookup_paris_response()]));
        let advanced = Arc::new(MockProvider::scripted(vec![text_response("18°C in Paris")]));
        let registry = ToolRegistry::new();
        registry.register(Box::new(LookupTool)).unwrap();
        let agent = loop_with(&basic, registry)
            .with_provider_select(ProviderSelect::escalate_past(3, advanced.clone()));

        // First call sees [system, user]; after the tool round trip the
        // sequence is four messages, so the second call escalates.
        let run = agent
            .run(
                vec![Message::user("Weather in Paris?")],
                &RunContext::empty(),
            )
            .await
            .unwrap();

        assert_eq!(basic.calls(), 1);
        assert_eq!(advanced.calls(), 1);
        assert_eq!(
            run.final_message.content.as_text(),
            Some("18°C in Paris")
        );
    }

    #[tokio::test]
    async fn malformed_call_arguments_are_recovered() {
        let provider = Arc::new(MockProvider::scripted(vec![
            ChatResponse {
                text: None,
                tool_calls: vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "lookup".to_string(),
                    arguments: "{not json".to_string(),
                }],
            },
            text_response("let me try again"),
        ]));
        let registry = ToolRegistry::new();
        registry.register(Box::new(LookupTool)).unwrap();
        let agent = loop_with(&provider, registry);

        let run = agent
            .run(vec![Message::user("Weather?")], &RunContext::empty())
            .await
            .unwrap();

        let payload: ToolOutcome =
            serde_json::from_str(run.messages[3].content.as_text().unwrap()).unwrap();
        assert_eq!(payload.error_kind, Some(ToolErrorKind::InvalidArguments));
    }
}
