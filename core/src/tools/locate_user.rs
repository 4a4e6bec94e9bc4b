use crate::agent::RunContext;
use crate::traits::{Tool, ToolErrorKind, ToolOutcome};
use async_trait::async_trait;
use serde_json::json;

/// Resolves the calling user's city from the `user_id` carried in the
/// run context. The id never comes from the model, so a prompt cannot
/// ask about somebody else's location.
pub struct LocateUserTool;

fn city_for(user_id: &str) -> Option<&'static str> {
    match user_id {
        "ABC123" => Some("Mangaluru"),
        "XYZ789" => Some("Bengaluru"),
        "LMN456" => Some("Chennai"),
        _ => None,
    }
}

#[async_trait]
impl Tool for LocateUserTool {
    fn name(&self) -> &str {
        "locate_user"
    }

    fn description(&self) -> &str {
        "Find the city of the user making the current request"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn invoke(
        &self,
        _args: serde_json::Value,
        ctx: &RunContext,
    ) -> anyhow::Result<ToolOutcome> {
        let Some(user_id) = ctx.get_str("user_id") else {
            return Ok(ToolOutcome::error(
                ToolErrorKind::ExecutionError,
                "No user_id available in the request context",
            ));
        };

        match city_for(user_id) {
            Some(city) => Ok(ToolOutcome::success(city)),
            None => Ok(ToolOutcome::error(
                ToolErrorKind::ExecutionError,
                format!("Could not determine a location for user '{}'", user_id),
            )),
        }
    }
}
