use sentitrade::config::AppConfig;
use sentitrade::error::Result;
use sentitrade::rl::training::{compute_avg_return, GreedyPolicy, RandomPolicy};
use tracing::info;

use super::{build_agent, build_environment};

pub(crate) async fn run_eval(
    config: AppConfig,
    episodes: Option<usize>,
    max_steps: Option<usize>,
) -> Result<()> {
    let episodes = episodes.unwrap_or(config.training.num_eval_episodes).max(1);
    let max_steps = max_steps.unwrap_or(config.training.max_eval_steps);

    let mut env = build_environment(&config).await?;
    let agent = build_agent(&config)?;

    let (greedy_return, greedy_steps) =
        compute_avg_return(&mut env, &mut GreedyPolicy::new(&agent), episodes, max_steps).await?;

    let mut random = RandomPolicy::new(agent.num_actions(), config.agent.seed);
    let (random_return, random_steps) =
        compute_avg_return(&mut env, &mut random, episodes, max_steps).await?;

    info!(
        episodes,
        greedy_return, random_return, "evaluation finished"
    );

    println!("\n=== Evaluation ({} episodes, {} max steps) ===", episodes, max_steps);
    println!("Greedy:  return {:>10.4}  steps {:>6.1}", greedy_return, greedy_steps);
    println!("Random:  return {:>10.4}  steps {:>6.1}", random_return, random_steps);
    Ok(())
}
