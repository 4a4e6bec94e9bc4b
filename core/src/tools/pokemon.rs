use crate::agent::RunContext;
use crate::tools::{extract_string_arg, http_client};
use crate::traits::{Tool, ToolErrorKind, ToolOutcome};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct PokemonRecord {
    name: String,
    height: f64,
    weight: f64,
    abilities: Vec<AbilitySlot>,
}

#[derive(Debug, Deserialize)]
struct AbilitySlot {
    ability: AbilityRef,
}

#[derive(Debug, Deserialize)]
struct AbilityRef {
    name: String,
}

/// Pokemon encyclopedia lookups against the public PokeAPI.
pub struct PokemonTool {
    client: reqwest::Client,
    base_url: String,
}

impl Default for PokemonTool {
    fn default() -> Self {
        Self::new()
    }
}

impl PokemonTool {
    pub fn new() -> Self {
        Self {
            client: http_client(10),
            base_url: "https://pokeapi.co/api/v2".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

fn title_case(name: &str) -> String {
    name.split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl Tool for PokemonTool {
    fn name(&self) -> &str {
        "pokemon_lookup"
    }

    fn description(&self) -> &str {
        "Query the PokeAPI database for Pokemon information by name or id"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "pokemon_name": {
                    "type": "string",
                    "description": "The name or ID of the Pokemon to look up"
                }
            },
            "required": ["pokemon_name"]
        })
    }

    async fn invoke(
        &self,
        args: serde_json::Value,
        _ctx: &RunContext,
    ) -> anyhow::Result<ToolOutcome> {
        let pokemon_name = extract_string_arg(&args, "pokemon_name")?
            .to_lowercase()
            .trim()
            .to_string();

        let response = match self
            .client
            .get(format!("{}/pokemon/{}", self.base_url, pokemon_name))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Ok(ToolOutcome::error(
                    ToolErrorKind::ExecutionError,
                    format!("Database query failed: {}", e),
                ));
            }
        };

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(ToolOutcome::error(
                ToolErrorKind::ExecutionError,
                format!(
                    "No Pokemon data found for '{}' in the PokeAPI database",
                    pokemon_name
                ),
            ));
        }

        if !response.status().is_success() {
            return Ok(ToolOutcome::error(
                ToolErrorKind::ExecutionError,
                format!("Database query failed with status {}", response.status()),
            ));
        }

        let record: PokemonRecord = match response.json().await {
            Ok(record) => record,
            Err(e) => {
                return Ok(ToolOutcome::error(
                    ToolErrorKind::ExecutionError,
                    format!("Unexpected PokeAPI response format: {}", e),
                ));
            }
        };

        let abilities: Vec<String> = record
            .abilities
            .iter()
            .map(|slot| title_case(&slot.ability.name))
            .collect();

        Ok(ToolOutcome::success(format!(
            "Pokemon: {}\nHeight: {} m\nWeight: {} kg\nAbilities: {}",
            title_case(&record.name),
            record.height / 10.0,
            record.weight / 10.0,
            abilities.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_cases_hyphenated_abilities() {
        assert_eq!(title_case("lightning-rod"), "Lightning Rod");
        assert_eq!(title_case("static"), "Static");
    }
}
