use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sentitrade")]
#[command(version = "0.1.0")]
#[command(about = "News-sentiment reinforcement-learning trading agent", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config directory (default.toml, $SENTITRADE_ENV.toml)
    #[arg(short, long, default_value = "config", env = "SENTITRADE_CONFIG_DIR")]
    pub config: PathBuf,

    /// Symbol to trade, overrides environment.symbol
    #[arg(short, long)]
    pub symbol: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the Q-network against the configured environment
    Train {
        /// Training iterations, overrides training.num_iterations
        #[arg(short, long)]
        iterations: Option<usize>,
        /// Append reward metrics to this CSV file
        #[arg(long)]
        metrics_csv: Option<PathBuf>,
        /// Print the training report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Average return of the greedy (untrained) and random policies
    Eval {
        /// Episodes per policy, overrides training.num_eval_episodes
        #[arg(short, long)]
        episodes: Option<usize>,
        /// Step cap per episode, overrides training.max_eval_steps
        #[arg(long)]
        max_steps: Option<usize>,
    },
    /// Build one observation and print its shapes and action scores
    Inspect {
        /// Instant to inspect (RFC 3339), defaults to the first session with data
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}
