use chrono::{DateTime, Utc};
use sentitrade::config::AppConfig;
use sentitrade::error::Result;
use sentitrade::rl::environment::ObservationBuilder;
use sentitrade::rl::ActionSpace;

use super::{build_agent, build_environment, build_sources};

pub(crate) async fn run_inspect(config: AppConfig, at: Option<DateTime<Utc>>) -> Result<()> {
    let symbol = config.environment.symbol.clone();

    let (observation, at) = match at {
        Some(at) => {
            let sources = build_sources(&config)?;
            let builder = ObservationBuilder::new(
                sources.prices,
                sources.news,
                sources.tokenizer,
                &config.environment,
            );
            (builder.build(&symbol, at).await?, at)
        }
        None => {
            let mut env = build_environment(&config).await?;
            let time_step = env.reset().await?;
            (time_step.observation, env.cursor())
        }
    };

    let agent = build_agent(&config)?;
    let scores = agent.q_values(&[&observation])?;
    let actions = ActionSpace::new(config.environment.use_neutrality).actions();

    println!("\n=== Observation {} @ {} ===", symbol, at);
    println!("symbol:     {:?}", observation.symbol);
    println!(
        "titles:     {} x {}",
        observation.titles.len(),
        observation.titles.first().map_or(0, Vec::len)
    );
    println!(
        "paragraphs: {} x {}",
        observation.paragraphs.len(),
        observation.paragraphs.first().map_or(0, Vec::len)
    );
    println!(
        "prices:     {} x {}",
        observation.prices.len(),
        observation.prices.first().map_or(0, |row| row.len())
    );
    if let Some(close) = observation.last_close() {
        println!("last close: {:.4}", close);
    }

    println!("\nAction scores:");
    for (label, score) in actions.iter().zip(scores.first().into_iter().flatten()) {
        println!("  {:<5} {:.6}", label.as_str(), score);
    }
    Ok(())
}
