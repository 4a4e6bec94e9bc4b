use anyhow::Result;
use clap::{Parser, Subcommand};
use errand_core::agent::{AgentLoop, RunContext, SystemPrompt, ToolRegistry, role_adapted_prompt};
use errand_core::traits::Message;
use errand_core::{config, providers, tools};
use serde_json::json;
use std::sync::Arc;

mod onboard;
mod repl;

#[derive(Parser)]
#[command(name = "errand")]
#[command(about = "errand - a tool-calling chat agent", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive configuration wizard
    Onboard,
    /// Talk to the agent, one-shot or as a REPL
    Chat {
        /// Send a single message and exit
        #[arg(short, long)]
        message: Option<String>,
        /// Attach an image URL to the message
        #[arg(long, requires = "message")]
        image: Option<String>,
        /// Caller id exposed to tools through the run context
        #[arg(long)]
        user_id: Option<String>,
        /// Adapt the assistant's register (expert, beginner, child)
        #[arg(long)]
        role: Option<String>,
    },
    /// List the registered tools
    Tools,
}

fn build_registry() -> Result<Arc<ToolRegistry>> {
    let registry = ToolRegistry::new();
    registry.register(Box::new(tools::WeatherTool::new()))?;
    registry.register(Box::new(tools::PokemonTool::new()))?;
    registry.register(Box::new(tools::LocateUserTool))?;
    Ok(Arc::new(registry))
}

fn build_context(user_id: Option<String>, role: Option<String>) -> RunContext {
    let mut fields = serde_json::Map::new();
    if let Some(user_id) = user_id {
        fields.insert("user_id".to_string(), json!(user_id));
    }
    if let Some(role) = role {
        fields.insert("user_role".to_string(), json!(role));
    }
    if fields.is_empty() {
        RunContext::empty()
    } else {
        RunContext::new(serde_json::Value::Object(fields))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat {
                message: None,
                image: None,
                user_id: None,
                role: None,
            }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard()?;
            config::save_config(&onboard_config)?;
        }
        Commands::Tools => {
            let registry = build_registry()?;
            for spec in registry.specs() {
                println!("{}\n  {}", spec.name, spec.description);
                println!("  parameters: {}", spec.parameters_schema);
            }
        }
        Commands::Chat {
            message,
            image,
            user_id,
            role,
        } => {
            let config = config::load_config()?;
            let provider = providers::create_provider(&config)?;
            let registry = build_registry()?;

            let agent = AgentLoop::new(provider, registry)
                .with_system_prompt(SystemPrompt::dynamic(role_adapted_prompt))
                .with_max_iterations(config.max_iterations);

            let ctx = build_context(user_id, role);

            if let Some(text) = message {
                let user_message = match image {
                    Some(url) => Message::user_with_image(text, url),
                    None => Message::user(text),
                };
                match agent.run(vec![user_message], &ctx).await {
                    Ok(run) => println!("{}", run.final_message.content.to_text_lossy()),
                    Err(failure) => {
                        eprintln!("error: {}", failure);
                        anyhow::bail!("agent run failed: {}", failure.error);
                    }
                }
            } else {
                repl::run(agent, ctx).await?;
            }
        }
    }

    Ok(())
}
