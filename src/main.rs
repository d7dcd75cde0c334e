use anyhow::{Context, Result};
use clap::Parser;
use sentitrade::cli::{Cli, Commands};
use sentitrade::config::AppConfig;
use sentitrade::error::SentiError;
use tracing::{error, info};

mod main_commands;
mod main_runtime;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    if let Some(symbol) = &cli.symbol {
        config.environment.symbol = symbol.clone();
    }

    let _log_guard = main_runtime::init_logging(&config.logging);

    if let Err(errors) = config.validate() {
        for e in &errors {
            error!("config: {}", e);
        }
        return Err(SentiError::Configuration(errors.join("; ")).into());
    }
    info!(config_dir = %cli.config.display(), "configuration loaded");

    match cli.command {
        Commands::Train {
            iterations,
            metrics_csv,
            json,
        } => main_commands::train::run_train(config, iterations, metrics_csv, json)
            .await
            .context("training failed"),
        Commands::Eval {
            episodes,
            max_steps,
        } => main_commands::eval::run_eval(config, episodes, max_steps)
            .await
            .context("evaluation failed"),
        Commands::Inspect { at } => main_commands::inspect::run_inspect(config, at)
            .await
            .context("inspection failed"),
    }
}
