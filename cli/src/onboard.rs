use anyhow::{Context, Result};
use console::style;
use dialoguer::{Input, Select};
use errand_core::config::Config;

const BANNER: &str = r"
    -------------------------------------
              e r r a n d
    -------------------------------------
";

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

struct ProviderChoice {
    name: &'static str,
    needs_key: bool,
    models: &'static [&'static str],
}

const PROVIDERS: &[ProviderChoice] = &[
    ProviderChoice {
        name: "openai",
        needs_key: true,
        models: &["gpt-4o", "gpt-4o-mini"],
    },
    ProviderChoice {
        name: "gemini",
        needs_key: true,
        models: &["gemini-2.5-flash", "gemini-2.5-pro"],
    },
    ProviderChoice {
        name: "ollama",
        needs_key: false,
        models: &["llama3.1:8b", "llama3.2"],
    },
];

fn setup_provider() -> Result<&'static ProviderChoice> {
    let names: Vec<&str> = PROVIDERS.iter().map(|p| p.name).collect();
    let selection = Select::new()
        .with_prompt("Select your provider")
        .items(&names)
        .default(0)
        .interact()
        .context("Failed to select provider")?;
    Ok(&PROVIDERS[selection])
}

fn setup_api_key(provider: &ProviderChoice) -> Result<String> {
    if !provider.needs_key {
        return Ok(String::new());
    }

    let api_key: String = Input::new()
        .with_prompt(format!("Enter your {} API key", provider.name))
        .interact_text()
        .context("Failed to read API key")?;

    if api_key.is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key)
}

fn setup_model(provider: &ProviderChoice) -> Result<String> {
    let selection = Select::new()
        .with_prompt("Select your model")
        .items(provider.models)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(provider.models[selection].to_string())
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to errand!").white().bold());
    println!(
        "  {}",
        style("This wizard will configure your agent in under 30 seconds.").dim()
    );
    println!();

    print_step(1, 3, "Provider Selection");
    let provider = setup_provider()?;

    print_step(2, 3, "API Key Setup");
    let api_key = setup_api_key(provider)?;

    print_step(3, 3, "Model Selection");
    let model = setup_model(provider)?;

    let config = Config {
        provider: Some(provider.name.to_string()),
        api_key,
        model,
        ..Default::default()
    };

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(errand_core::config::get_config_path().display()).cyan()
    );
    println!();
    println!(
        "  {} You can now run: {}",
        style("→").green(),
        style("errand chat").cyan().bold()
    );
    println!();

    Ok(config)
}
