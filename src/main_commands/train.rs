use sentitrade::config::AppConfig;
use sentitrade::error::Result;
use sentitrade::rl::Trainer;
use std::path::PathBuf;
use tracing::{info, info_span};

use super::{build_agent, build_environment};

pub(crate) async fn run_train(
    mut config: AppConfig,
    iterations: Option<usize>,
    metrics_csv: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    if let Some(iterations) = iterations {
        config.training.num_iterations = iterations;
    }
    if metrics_csv.is_some() {
        config.training.metrics_csv = metrics_csv;
    }

    info!(
        symbol = %config.environment.symbol,
        iterations = config.training.num_iterations,
        neutrality = config.environment.use_neutrality,
        "starting training"
    );

    let mut env = build_environment(&config).await?;
    let mut agent = build_agent(&config)?;
    let mut trainer = Trainer::new(config.training.clone())?
        .with_span(info_span!("trainer", symbol = %config.environment.symbol));

    let report = trainer.run(&mut env, &mut agent).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n=== Training Report ===");
    println!("Symbol:         {}", config.environment.symbol);
    println!("Iterations:     {}", report.losses.len());
    if let Some(loss) = report.losses.last() {
        println!("Final loss:     {:.6}", loss);
    }
    for (i, (ret, steps)) in report.returns.iter().zip(&report.eval_steps).enumerate() {
        println!("Eval {:>3}:       return {:>10.4}  steps {:>6.1}", i, ret, steps);
    }
    println!(
        "Rewards:        total {:.4}  avg {:.4}  min {:.4}  max {:.4}",
        report.metric.tot_reward,
        report.metric.avg_reward,
        report.metric.min_reward,
        report.metric.max_reward
    );
    if let Some(path) = &config.training.metrics_csv {
        println!("Metrics CSV:    {}", path.display());
    }
    Ok(())
}
