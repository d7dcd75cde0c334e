mod common;

use chrono::{Datelike, Timelike, Weekday};
use common::{config, environment, flat_source, hourly_source, ts};
use sentitrade::rl::core::{PARAGRAPH_TOKENS, PRICE_FIELDS, PRICE_WINDOW, SYMBOL_TOKENS, TITLE_TOKENS};
use sentitrade::rl::{EnvConfig, EnvState, NeutralityOrder, StepType};

fn close_override(
    overrides: &'static [(u32, u32, u32, f64)],
) -> impl Fn(usize, chrono::DateTime<chrono::Utc>) -> f64 {
    move |_, at| {
        overrides
            .iter()
            .find(|(m, d, h, _)| at == ts(*m, *d, *h))
            .map(|(_, _, _, close)| *close)
            .unwrap_or(100.0)
    }
}

#[tokio::test]
async fn sell_into_a_falling_market_earns_the_drop() {
    let mut env = environment(config(), hourly_source(close_override(&[(1, 4, 10, 95.0)]))).await;
    env.reset().await.unwrap();
    assert_eq!(env.percent(), 100.0);

    let step = env.step(0).await.unwrap();
    assert!((step.reward - 5.0).abs() < 1e-9);
    assert!((env.percent() - 105.0).abs() < 1e-9);
}

#[tokio::test]
async fn buy_into_a_rising_market_earns_the_rise() {
    let mut env = environment(config(), hourly_source(close_override(&[(1, 4, 10, 110.0)]))).await;
    env.reset().await.unwrap();

    let step = env.step(1).await.unwrap();
    assert!((step.reward - 10.0).abs() < 1e-9);
    assert!((env.percent() - 110.0).abs() < 1e-9);
}

#[tokio::test]
async fn going_bust_ends_the_episode_and_restores_the_limit() {
    let mut env = environment(config(), hourly_source(close_override(&[(1, 4, 10, 250.0)]))).await;
    env.reset().await.unwrap();

    let step = env.step(0).await.unwrap();
    assert!((step.reward + 150.0).abs() < 1e-9);
    assert_eq!(step.step_type, StepType::Last);
    assert_eq!(env.state(), EnvState::Done);
    assert_eq!(env.percent(), 100.0);

    let first = env.reset().await.unwrap();
    assert!(first.is_first());
    assert_eq!(env.percent(), 100.0);
}

#[tokio::test]
async fn episodes_end_within_the_step_limit() {
    let config = EnvConfig {
        limit_steps: Some(5),
        ..config()
    };
    let mut env = environment(config, flat_source()).await;

    for _ in 0..3 {
        env.reset().await.unwrap();
        let mut steps = 0;
        loop {
            let step = env.step(steps % 2).await.unwrap();
            steps += 1;
            if step.is_last() {
                break;
            }
            assert!(steps < 5, "episode ran past the step limit");
        }
        assert_eq!(steps, 5);
        assert_eq!(env.percent(), 100.0);
    }
}

#[tokio::test]
async fn the_step_before_stop_ends_the_episode_and_rewinds() {
    let config = EnvConfig {
        start: ts(1, 4, 9),
        stop: ts(1, 5, 9),
        ..config()
    };
    let mut env = environment(config, flat_source()).await;
    env.reset().await.unwrap();

    let mut steps = 0;
    loop {
        let step = env.step(steps % 2).await.unwrap();
        steps += 1;
        if step.is_last() {
            break;
        }
        assert!(steps < 100, "episode never reached the stop date");
    }
    // 10:00 through 23:00, then the 2021-01-05 open sits on stop
    assert_eq!(steps, 15);
    assert_eq!(env.cursor(), ts(1, 4, 9));
    assert_eq!(env.state(), EnvState::Done);
}

#[tokio::test]
async fn step_limit_rewinds_when_the_next_episode_would_cross_stop() {
    let run = |stop| async move {
        let config = EnvConfig {
            start: ts(1, 4, 9),
            stop,
            limit_steps: Some(5),
            ..config()
        };
        let mut env = environment(config, flat_source()).await;
        env.reset().await.unwrap();
        let mut last = None;
        for i in 0..5 {
            last = Some(env.step(i % 2).await.unwrap());
        }
        assert!(last.map(|s| s.is_last()).unwrap_or(false));
        env.cursor()
    };

    // five more steps from 14:00 land on 19:00
    assert_eq!(run(ts(1, 4, 18)).await, ts(1, 4, 9));
    assert_eq!(run(ts(1, 4, 20)).await, ts(1, 4, 14));
}

#[tokio::test]
async fn observation_shapes_never_change() {
    let mut env = environment(config(), flat_source()).await;
    let spec = env.observation_spec();
    let mut time_step = env.reset().await.unwrap();

    for i in 0..40 {
        let observation = &time_step.observation;
        assert_eq!(observation.symbol.len(), SYMBOL_TOKENS);
        assert_eq!(observation.titles.len(), 2);
        assert!(observation.titles.iter().all(|t| t.len() == TITLE_TOKENS));
        assert!(observation.paragraphs.iter().all(|p| p.len() == PARAGRAPH_TOKENS));
        assert_eq!(observation.prices.len(), PRICE_WINDOW);
        assert!(observation.prices.iter().all(|row| row.len() == PRICE_FIELDS));
        assert!(spec.validate(observation).is_ok());

        time_step = env.step(i % 2).await.unwrap();
    }
}

#[tokio::test]
async fn cursor_stays_inside_sessions_and_the_date_range() {
    let config = config();
    let (start, stop) = (config.start, config.stop);
    let mut env = environment(config, flat_source()).await;
    env.reset().await.unwrap();

    for i in 0..300 {
        env.step(i % 2).await.unwrap();
        let cursor = env.cursor();
        assert!(cursor >= start && cursor <= stop, "cursor {} escaped", cursor);
        assert!(cursor.hour() >= 9, "cursor {} before the open", cursor);
        assert!(
            !matches!(cursor.weekday(), Weekday::Sat | Weekday::Sun),
            "cursor {} on a weekend",
            cursor
        );
    }
}

#[tokio::test]
async fn scale_first_amplifies_a_correct_call_after_holding() {
    // price drifts down while holding, then the sell pays off
    let prices = hourly_source(close_override(&[
        (1, 4, 9, 100.0),
        (1, 4, 10, 99.0),
        (1, 4, 11, 98.0),
        (1, 4, 12, 97.0),
    ]));
    let config = EnvConfig {
        use_neutrality: true,
        neutrality_order: NeutralityOrder::ScaleFirst,
        ..config()
    };
    let mut env = environment(config, prices).await;
    env.reset().await.unwrap();

    assert_eq!(env.step(2).await.unwrap().reward, 0.0);
    assert_eq!(env.step(2).await.unwrap().reward, 0.0);
    assert_eq!(env.neutrality_count(), 2);

    let sell = env.step(0).await.unwrap();
    let raw = (98.0 - 97.0) / 98.0 * 100.0;
    assert!(sell.reward > raw, "reward {} not amplified past {}", sell.reward, raw);
    assert_eq!(env.neutrality_count(), 0);
}

#[tokio::test]
async fn reset_first_never_scales() {
    let prices = hourly_source(close_override(&[(1, 4, 11, 90.0)]));
    let config = EnvConfig {
        use_neutrality: true,
        ..config()
    };
    let mut env = environment(config, prices).await;
    env.reset().await.unwrap();

    env.step(2).await.unwrap();
    let sell = env.step(0).await.unwrap();
    assert!((sell.reward - 10.0).abs() < 1e-9);
}
