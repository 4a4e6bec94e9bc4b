use crate::agent::RunContext;
use crate::tools::{extract_string_arg, http_client};
use crate::traits::{Tool, ToolErrorKind, ToolOutcome};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct WttrReport {
    current_condition: Vec<WttrCondition>,
}

#[derive(Debug, Deserialize)]
struct WttrCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "temp_F")]
    temp_f: String,
    humidity: String,
    #[serde(rename = "weatherDesc")]
    weather_desc: Vec<WttrDesc>,
}

#[derive(Debug, Deserialize)]
struct WttrDesc {
    value: String,
}

/// Current weather for a city via the wttr.in JSON endpoint.
pub struct WeatherTool {
    client: reqwest::Client,
    base_url: String,
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherTool {
    pub fn new() -> Self {
        Self {
            client: http_client(10),
            base_url: "https://wttr.in".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Return current weather information for a given city"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "city": {
                    "type": "string",
                    "description": "Name of the city to look up"
                }
            },
            "required": ["city"]
        })
    }

    async fn invoke(
        &self,
        args: serde_json::Value,
        _ctx: &RunContext,
    ) -> anyhow::Result<ToolOutcome> {
        let city = extract_string_arg(&args, "city")?;

        let response = match self
            .client
            .get(format!("{}/{}", self.base_url, city))
            .query(&[("format", "j1")])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Ok(ToolOutcome::error(
                    ToolErrorKind::ExecutionError,
                    format!("Error getting weather: {}", e),
                ));
            }
        };

        if !response.status().is_success() {
            return Ok(ToolOutcome::error(
                ToolErrorKind::ExecutionError,
                format!("Weather service returned status {}", response.status()),
            ));
        }

        let report: WttrReport = match response.json().await {
            Ok(report) => report,
            Err(_) => {
                return Ok(ToolOutcome::error(
                    ToolErrorKind::ExecutionError,
                    "Received invalid JSON from weather service",
                ));
            }
        };

        let Some(current) = report.current_condition.first() else {
            return Ok(ToolOutcome::error(
                ToolErrorKind::ExecutionError,
                "Weather report has no current conditions",
            ));
        };

        let description = current
            .weather_desc
            .first()
            .map(|d| d.value.as_str())
            .unwrap_or("No description");

        Ok(ToolOutcome::success(format!(
            "Weather in {}: {}. Temperature {}°C ({}°F), humidity {}%.",
            city, description, current.temp_c, current.temp_f, current.humidity
        )))
    }
}
