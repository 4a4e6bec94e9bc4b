use crate::error::AgentError;
use crate::providers::images::image_to_base64;
use crate::traits::{
    ChatRequest, ChatResponse, ContentPart, Message, MessageContent, Provider, Role, ToolCall,
    ToolSpec,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiToolGroup>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<GeminiFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<GeminiFunctionResponse>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
            function_call: None,
            function_response: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionCall {
    name: String,
    args: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionResponse {
    name: String,
    response: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolGroup {
    function_declarations: Vec<GeminiFunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct GeminiFunctionDeclaration {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    function_call: Option<GeminiResponseFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseFunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

/// Client for Google's `generativelanguage` REST API, the hosted
/// provider behind the `gemini-*` model family.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.5,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    async fn convert_parts(&self, content: &MessageContent) -> Result<Vec<GeminiPart>, AgentError> {
        match content {
            MessageContent::Text(t) => Ok(vec![GeminiPart::text(t)]),
            MessageContent::Parts(parts) => {
                let mut converted = Vec::with_capacity(parts.len());
                for part in parts {
                    match part {
                        ContentPart::Text { text } => converted.push(GeminiPart::text(text)),
                        ContentPart::Image { url } => {
                            let (mime_type, data) = image_to_base64(&self.client, url).await?;
                            converted.push(GeminiPart {
                                text: None,
                                inline_data: Some(GeminiInlineData { mime_type, data }),
                                function_call: None,
                                function_response: None,
                            });
                        }
                    }
                }
                Ok(converted)
            }
        }
    }

    /// Splits the history into Gemini's `systemInstruction` plus a list
    /// of alternating user/model contents. Tool results travel back as
    /// `functionResponse` parts in a user turn, keyed by tool name since
    /// the API has no call ids.
    async fn convert_messages(
        &self,
        messages: &[Message],
    ) -> Result<(Option<GeminiContent>, Vec<GeminiContent>), AgentError> {
        let mut system_instruction: Option<GeminiContent> = None;
        let mut contents = Vec::new();

        for message in messages {
            match message.role {
                Role::System => {
                    let parts = self.convert_parts(&message.content).await?;
                    match &mut system_instruction {
                        None => system_instruction = Some(GeminiContent { role: None, parts }),
                        Some(existing) => existing.parts.extend(parts),
                    }
                }
                Role::User => {
                    contents.push(GeminiContent {
                        role: Some("user"),
                        parts: self.convert_parts(&message.content).await?,
                    });
                }
                Role::Assistant => {
                    let mut parts = Vec::new();
                    if !message.content.is_empty() {
                        parts.extend(self.convert_parts(&message.content).await?);
                    }
                    for call in message.tool_calls.iter().flatten() {
                        parts.push(GeminiPart {
                            text: None,
                            inline_data: None,
                            function_call: Some(GeminiFunctionCall {
                                name: call.name.clone(),
                                args: serde_json::from_str(&call.arguments)
                                    .unwrap_or(serde_json::Value::Null),
                            }),
                            function_response: None,
                        });
                    }
                    contents.push(GeminiContent {
                        role: Some("model"),
                        parts,
                    });
                }
                Role::Tool => {
                    let payload = message.content.to_text_lossy();
                    let response = serde_json::from_str(&payload)
                        .unwrap_or_else(|_| json!({ "content": payload }));
                    contents.push(GeminiContent {
                        role: Some("user"),
                        parts: vec![GeminiPart {
                            text: None,
                            inline_data: None,
                            function_call: None,
                            function_response: Some(GeminiFunctionResponse {
                                name: message.tool_name.clone().unwrap_or_else(|| "tool".into()),
                                response,
                            }),
                        }],
                    });
                }
            }
        }

        Ok((system_instruction, contents))
    }

    fn convert_tools(&self, tools: &[ToolSpec]) -> Vec<GeminiToolGroup> {
        vec![GeminiToolGroup {
            function_declarations: tools
                .iter()
                .map(|t| GeminiFunctionDeclaration {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters_schema.clone(),
                })
                .collect(),
        }]
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ChatResponse, AgentError> {
        let (system_instruction, contents) = self.convert_messages(request.messages).await?;

        let gemini_request = GeminiRequest {
            system_instruction,
            contents,
            tools: request.tools.map(|t| self.convert_tools(t)),
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&gemini_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AgentError::Transport(format!(
                "Gemini error {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let candidate = gemini_response
            .candidates
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("no candidates in response".to_string()))?;

        let parts = candidate
            .content
            .map(|c| c.parts)
            .ok_or_else(|| AgentError::Provider("candidate has no content".to_string()))?;

        let mut text_parts = Vec::new();
        let mut tool_calls = Vec::new();
        for part in parts {
            if let Some(text) = part.text {
                text_parts.push(text);
            }
            if let Some(call) = part.function_call {
                tool_calls.push(ToolCall {
                    id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                    name: call.name,
                    arguments: serde_json::to_string(&call.args).unwrap_or_default(),
                });
            }
        }

        if text_parts.is_empty() && tool_calls.is_empty() {
            return Err(AgentError::Provider(
                "empty response: no text or function calls".to_string(),
            ));
        }

        let text = (!text_parts.is_empty()).then(|| text_parts.join(""));
        Ok(ChatResponse { text, tool_calls })
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_messages_become_the_system_instruction() {
        let provider = GeminiProvider::new("test-key");
        let messages = vec![Message::system("You are a Pokedex."), Message::user("hi")];
        let (system, contents) = provider.convert_messages(&messages).await.unwrap();
        assert_eq!(
            system.unwrap().parts[0].text.as_deref(),
            Some("You are a Pokedex.")
        );
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].role, Some("user"));
    }

    #[tokio::test]
    async fn tool_results_map_to_function_responses() {
        let provider = GeminiProvider::new("test-key");
        let messages = vec![
            Message::user("weather?"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "get_weather".to_string(),
                    arguments: "{\"city\":\"Paris\"}".to_string(),
                }],
            ),
            Message::tool_result("call_1", "get_weather", "{\"temp\":18}"),
        ];
        let (_, contents) = provider.convert_messages(&messages).await.unwrap();

        assert_eq!(contents[1].role, Some("model"));
        let call = contents[1].parts[0].function_call.as_ref().unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.args["city"], "Paris");

        let response = contents[2].parts[0].function_response.as_ref().unwrap();
        assert_eq!(response.name, "get_weather");
        assert_eq!(response.response["temp"], 18);
    }
}
