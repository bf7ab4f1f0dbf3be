use analyst_core::config::{AnalystConfig, get_default_config_file};
use analyst_core::{AnalystClient, Command, Dispatcher};
use anyhow::Context;
use clap::Parser;
use colored::*;

mod app;
mod cli;
mod input;
mod logging;
mod output;

use crate::cli::Args;
use crate::output::{print_error, print_models, print_usage_instructions};

/// Main function - Loads configuration and talks to Cortex Analyst
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env before the config reads them
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => get_default_config_file().context("Failed to locate config file")?,
    };

    if args.init_config {
        if config_path.exists() {
            println!("Config file already exists at {}", config_path.display());
        } else {
            AnalystConfig::defaults()
                .save_to_file(&config_path)
                .context("Failed to write config file")?;
            println!("Wrote default config to {}", config_path.display());
        }
        return Ok(());
    }

    // File, then environment, then command line
    let config = AnalystConfig::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .merge(&args.overrides());

    // Initialize logger with configured log level
    logging::init_logging(config.log_level.as_deref())?;
    tracing::debug!(config = %config_path.display(), "Configuration loaded");

    let registry = config
        .semantic_model_registry()
        .context("Invalid semantic model configuration")?;

    if args.list_models {
        print_models(&registry, Some(registry.default_model()));
        return Ok(());
    }

    let client = match AnalystClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            print_error(&format!("Failed to initialize Cortex Analyst client: {}", e));
            eprintln!(
                "{}",
                "Set SNOWFLAKE_ACCOUNT and SNOWFLAKE_TOKEN, or add them to the config file.".red()
            );
            return Err(e.into());
        }
    };

    let dispatcher = Dispatcher::new(client, registry);
    let mut session = dispatcher.new_session();
    tracing::info!(session = %session.id(), model = %session.semantic_model(), "Session started");

    if let Some(model) = &args.model {
        dispatcher
            .dispatch(&mut session, Command::SelectSemanticModel(model.clone()))
            .await
            .context("Failed to select semantic model")?;
    }

    // Call app logic based on arguments
    if args.interactive {
        crate::app::run_interactive_chat(&dispatcher, &mut session).await?;
    } else if let Some(prompt) = args.prompt.clone() {
        crate::app::run_single_query(prompt, &dispatcher, &mut session).await?;
    } else {
        // No prompt and not interactive, show usage
        print_usage_instructions();
    }

    Ok(())
}
