#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sentitrade::data::{session_bars, FixtureNewsSource, FixturePriceSource, HashingTokenizer};
use sentitrade::domain::{Interval, NewsItem};
use sentitrade::rl::{EnvConfig, TradingEnvironment};
use std::sync::Arc;

pub const SYMBOL: &str = "AAPL";

pub fn ts(m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, m, d, h, 0, 0).unwrap()
}

/// Hourly weekday bars from January through March, 09:00 to midnight
pub fn hourly_source(close: impl Fn(usize, DateTime<Utc>) -> f64) -> FixturePriceSource {
    let bars = session_bars(
        Utc.with_ymd_and_hms(2020, 12, 1, 0, 0, 0).unwrap(),
        ts(3, 31, 23),
        Interval::hours(1),
        9,
        24,
        close,
    );
    FixturePriceSource::new()
        .with_bars(SYMBOL, bars)
        .with_exchange(SYMBOL, "NASDAQ")
}

pub fn flat_source() -> FixturePriceSource {
    hourly_source(|_, _| 100.0)
}

pub fn headlines() -> Vec<NewsItem> {
    (0..6)
        .map(|i| NewsItem {
            url: format!("https://news.example/aapl/{}", i),
            symbols: vec![SYMBOL.to_string()],
            title: format!("Apple shares move on report {}", i),
            paragraphs: vec![
                "Apple reported quarterly results.".to_string(),
                "Analysts expect strong demand.".to_string(),
            ],
            published_at: ts(1, 1 + i, 12),
        })
        .collect()
}

pub fn config() -> EnvConfig {
    EnvConfig {
        start: ts(1, 4, 9),
        stop: ts(2, 26, 9),
        news_limit: 2,
        limit_steps: None,
        ..Default::default()
    }
}

pub async fn environment(config: EnvConfig, prices: FixturePriceSource) -> TradingEnvironment {
    TradingEnvironment::new(
        config,
        Arc::new(prices),
        Arc::new(FixtureNewsSource::new(headlines())),
        Arc::new(HashingTokenizer::new(64)),
    )
    .await
    .unwrap()
}
