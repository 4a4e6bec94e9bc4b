use crate::error::AgentError;
use crate::providers::images::image_to_base64;
use crate::traits::{
    ChatRequest, ChatResponse, ContentPart, Message, MessageContent, Provider, ToolCall, ToolSpec,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OllamaTool>>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    images: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OllamaToolCallRequest>>,
}

#[derive(Debug, Serialize)]
struct OllamaToolCallRequest {
    function: OllamaFunctionRequest,
}

#[derive(Debug, Serialize)]
struct OllamaFunctionRequest {
    name: String,
    arguments: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    r#type: String,
    function: OllamaToolFunction,
}

#[derive(Debug, Serialize)]
struct OllamaToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OllamaToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCallResponse {
    function: OllamaFunctionResponse,
}

#[derive(Debug, Deserialize)]
struct OllamaFunctionResponse {
    name: String,
    arguments: serde_json::Value,
}

/// Client for a local Ollama daemon's `/api/chat` endpoint. Image parts
/// are inlined as base64 since Ollama does not fetch URLs itself.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f64,
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OllamaProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            temperature: 0.3,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    async fn convert_message(&self, message: &Message) -> Result<OllamaMessage, AgentError> {
        let (content, images) = match &message.content {
            MessageContent::Text(t) => (t.clone(), None),
            MessageContent::Parts(parts) => {
                let mut text_parts = Vec::new();
                let mut images = Vec::new();
                for part in parts {
                    match part {
                        ContentPart::Text { text } => text_parts.push(text.clone()),
                        ContentPart::Image { url } => {
                            let (_, data) = image_to_base64(&self.client, url).await?;
                            images.push(data);
                        }
                    }
                }
                let images = (!images.is_empty()).then_some(images);
                (text_parts.join("\n"), images)
            }
        };

        let tool_calls = message.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|tc| OllamaToolCallRequest {
                    function: OllamaFunctionRequest {
                        name: tc.name.clone(),
                        arguments: serde_json::from_str(&tc.arguments)
                            .unwrap_or(serde_json::Value::Null),
                    },
                })
                .collect()
        });

        Ok(OllamaMessage {
            role: message.role.as_str(),
            content,
            images,
            tool_calls,
        })
    }

    fn convert_tools(&self, tools: &[ToolSpec]) -> Vec<OllamaTool> {
        tools
            .iter()
            .map(|t| OllamaTool {
                r#type: "function".to_string(),
                function: OllamaToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters_schema.clone(),
                },
            })
            .collect()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatResponse, AgentError> {
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in request.messages {
            messages.push(self.convert_message(message).await?);
        }

        let ollama_request = OllamaRequest {
            model: self.model.clone(),
            messages,
            tools: request.tools.map(|t| self.convert_tools(t)),
            options: OllamaOptions {
                temperature: self.temperature,
            },
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ollama_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::Transport(format!(
                "Ollama error {}: {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaResponse = response.json().await?;

        // Ollama does not assign call ids; mint one per request so the
        // result message can still reference its call.
        let tool_calls: Vec<ToolCall> = ollama_response
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                name: c.function.name,
                arguments: serde_json::to_string(&c.function.arguments).unwrap_or_default(),
            })
            .collect();

        Ok(ChatResponse {
            text: ollama_response.message.content,
            tool_calls,
        })
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
