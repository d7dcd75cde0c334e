mod common;

use burn::backend::{Autodiff, NdArray};
use burn::optim::AdamConfig;
use burn::prelude::Backend;
use common::{hourly_source, ts};
use sentitrade::data::{FixtureNewsSource, HashingTokenizer};
use sentitrade::rl::networks::{PriceBranchConfig, TextBranchConfig};
use sentitrade::rl::training::{
    compute_avg_return, CollectDriver, Policy, RandomPolicy, TradingMetric,
};
use sentitrade::rl::{
    DqnAgent, DqnConfig, EnvConfig, QNetworkConfig, ReplayBuffer, Trainer, TradingEnvironment,
    TradingQNetwork, TrainingConfig,
};
use std::sync::Arc;

type TestBackend = Autodiff<NdArray<f32>>;

const VOCAB: usize = 32;

fn tiny_network(device: &<TestBackend as Backend>::Device) -> TradingQNetwork<TestBackend> {
    let text = TextBranchConfig::new()
        .with_embed_dim(4)
        .with_lstm_units(vec![4])
        .with_dense_units(vec![4]);
    QNetworkConfig::new()
        .with_title(text.clone())
        .with_paragraph(text)
        .with_price(
            PriceBranchConfig::new()
                .with_lstm_units(vec![4])
                .with_dense_units(vec![4]),
        )
        .with_sentiment_units(vec![4])
        .with_head_units(vec![4])
        .sized_for(VOCAB, 2)
        .init(device)
        .unwrap()
}

async fn environment() -> TradingEnvironment {
    let config = EnvConfig {
        start: ts(1, 4, 9),
        stop: ts(2, 26, 9),
        news_limit: 1,
        limit_steps: Some(5),
        ..Default::default()
    };
    TradingEnvironment::new(
        config,
        Arc::new(hourly_source(|i, _| 100.0 + (i % 7) as f64)),
        Arc::new(FixtureNewsSource::new(common::headlines())),
        Arc::new(HashingTokenizer::new(VOCAB)),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn driver_fills_the_buffer_and_feeds_observers() {
    let mut env = environment().await;
    let mut buffer = ReplayBuffer::new(8);
    let mut metric = TradingMetric::new();
    let mut policy = RandomPolicy::new(2, 3);
    let mut driver = CollectDriver::new();

    let stats = driver
        .run(&mut env, &mut policy, 12, &mut [&mut metric], &mut buffer)
        .await
        .unwrap();

    assert_eq!(stats.steps, 12);
    // five-step episodes
    assert_eq!(stats.episodes_finished, 2);
    assert_eq!(metric.count(), 12);
    assert_eq!(buffer.len(), 8);
    // transitions 5..=12 survive, both episode ends among them
    assert_eq!(buffer.iter().filter(|t| t.done).count(), 2);
    assert!((metric.snapshot().tot_reward - stats.total_reward).abs() < 1e-4);
}

#[tokio::test]
async fn trainer_reports_losses_returns_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("metrics.csv");

    let device = Default::default();
    let agent_config = DqnConfig::new().with_batch_size(4).with_seed(7);
    let mut agent = DqnAgent::new(
        tiny_network(&device),
        AdamConfig::new().init::<TestBackend, TradingQNetwork<TestBackend>>(),
        agent_config,
        device,
    );
    let mut env = environment().await;

    let mut trainer = Trainer::new(TrainingConfig {
        initial_collect_steps: 4,
        collect_steps_per_iteration: 1,
        num_iterations: 4,
        replay_capacity: 16,
        log_interval: 2,
        eval_interval: 2,
        num_eval_episodes: 1,
        max_eval_steps: 3,
        metrics_csv: Some(csv.clone()),
    })
    .unwrap();

    let report = trainer.run(&mut env, &mut agent).await.unwrap();

    assert_eq!(report.losses.len(), 4);
    assert!(report.losses.iter().all(|l| l.is_finite()));
    assert_eq!(report.returns.len(), 3);
    assert_eq!(report.eval_steps.len(), 3);
    assert!(report.eval_steps.iter().all(|&s| s <= 3.0));
    assert_eq!(agent.train_steps(), 4);

    let contents = std::fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "tot_reward,avg_reward,min_reward,max_reward");
}

#[test]
fn trainer_rejects_invalid_configuration() {
    let config = TrainingConfig {
        replay_capacity: 0,
        ..Default::default()
    };
    assert!(Trainer::new(config).is_err());
}

#[tokio::test]
async fn q_values_score_every_action_of_a_live_observation() {
    let device = Default::default();
    let agent = DqnAgent::new(
        tiny_network(&device),
        AdamConfig::new().init::<TestBackend, TradingQNetwork<TestBackend>>(),
        DqnConfig::new(),
        device,
    );
    let mut env = environment().await;
    let first = env.reset().await.unwrap();
    let second = env.step(1).await.unwrap();

    let scores = agent
        .q_values(&[&first.observation, &second.observation])
        .unwrap();
    assert_eq!(scores.len(), 2);
    assert!(scores.iter().all(|row| row.len() == 2));
    // sigmoid-bounded head
    assert!(scores.iter().flatten().all(|&q| (0.0..=1.0).contains(&q)));
    assert!(agent.greedy_action(&first.observation).unwrap() < 2);
}

#[tokio::test]
async fn average_return_accepts_any_policy() {
    let mut env = environment().await;
    let mut random = RandomPolicy::new(2, 11);

    let (avg_return, avg_steps) = compute_avg_return(&mut env, &mut random, 2, 50)
        .await
        .unwrap();
    // five-step episodes end before the cap
    assert_eq!(avg_steps, 5.0);
    assert!(avg_return.is_finite());

    let mut boxed: Box<dyn Policy> = Box::new(RandomPolicy::new(2, 11));
    let (capped_return, capped_steps) = compute_avg_return(&mut env, boxed.as_mut(), 1, 3)
        .await
        .unwrap();
    assert_eq!(capped_steps, 3.0);
    assert!(capped_return.is_finite());

    assert_eq!(
        compute_avg_return(&mut env, &mut random, 0, 50).await.unwrap(),
        (0.0, 0.0)
    );
}
