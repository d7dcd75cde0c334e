//! Deterministic replay sources for tests and offline runs.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::sources::{NewsSource, PriceSource};
use crate::domain::{Bar, Interval, NewsItem};
use crate::error::{Result, SentiError};

/// On-disk layout of a recorded price fixture
#[derive(Debug, Default, Deserialize)]
pub struct PriceFixtureFile {
    #[serde(default)]
    pub bars: HashMap<String, Vec<Bar>>,
    #[serde(default)]
    pub exchanges: HashMap<String, String>,
}

/// Price source replaying in-memory bars
#[derive(Debug, Default)]
pub struct FixturePriceSource {
    bars: HashMap<String, Vec<Bar>>,
    exchanges: HashMap<String, String>,
    fail_after: Option<(usize, String)>,
    calls: AtomicUsize,
}

impl FixturePriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: PriceFixtureFile = serde_json::from_str(raw)?;
        let mut source = Self::new();
        for (symbol, bars) in file.bars {
            source = source.with_bars(&symbol, bars);
        }
        source.exchanges = file.exchanges;
        Ok(source)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_bars(mut self, symbol: &str, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        self.bars.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_exchange(mut self, symbol: &str, exchange: &str) -> Self {
        self.exchanges
            .insert(symbol.to_string(), exchange.to_string());
        self
    }

    /// Every `bars` call after the first `calls` fails with a provider error
    pub fn fail_after(mut self, calls: usize, message: &str) -> Self {
        self.fail_after = Some((calls, message.to_string()));
        self
    }

    /// Number of `bars` calls served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Overwrite the close of the bar stamped exactly `at`
    pub fn set_close(&mut self, symbol: &str, at: DateTime<Utc>, close: f64) -> bool {
        match self
            .bars
            .get_mut(symbol)
            .and_then(|bars| bars.iter_mut().find(|b| b.timestamp == at))
        {
            Some(bar) => {
                bar.close = close;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl PriceSource for FixturePriceSource {
    async fn bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        _interval: Interval,
    ) -> Result<Vec<Bar>> {
        let served = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((limit, message)) = &self.fail_after {
            if served >= *limit {
                return Err(SentiError::provider("fixture", message));
            }
        }

        Ok(self
            .bars
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.timestamp >= start && b.timestamp <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn exchange(&self, symbol: &str) -> Result<Option<String>> {
        Ok(self.exchanges.get(symbol).cloned())
    }
}

/// News source replaying in-memory articles
#[derive(Debug, Default)]
pub struct FixtureNewsSource {
    items: Vec<NewsItem>,
    calls: AtomicUsize,
}

impl FixtureNewsSource {
    pub fn new(items: Vec<NewsItem>) -> Self {
        Self {
            items,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let items: Vec<NewsItem> = serde_json::from_str(raw)?;
        Ok(Self::new(items))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsSource for FixtureNewsSource {
    async fn news(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NewsItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut items: Vec<NewsItem> = self
            .items
            .iter()
            .filter(|n| n.published_at >= start && n.published_at <= end)
            .filter(|n| symbols.iter().any(|s| n.mentions(s)))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items.truncate(limit);
        Ok(items)
    }
}

/// Bars every `interval` from `start` to `end` inclusive, keeping only
/// timestamps whose hour lies in `[open_hour, close_hour)` on weekdays.
/// `close(i, ts)` supplies the close of the i-th emitted bar.
pub fn session_bars(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Interval,
    open_hour: u32,
    close_hour: u32,
    mut close: impl FnMut(usize, DateTime<Utc>) -> f64,
) -> Vec<Bar> {
    use chrono::{Datelike, Weekday};

    let step = interval.duration().max(Duration::minutes(1));
    let mut bars = Vec::new();
    let mut ts = start;
    while ts <= end {
        let weekday = !matches!(ts.weekday(), Weekday::Sat | Weekday::Sun);
        if weekday && ts.hour() >= open_hour && ts.hour() < close_hour {
            let price = close(bars.len(), ts);
            bars.push(Bar::flat(ts, price));
        }
        ts += step;
    }
    bars
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 1, d, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_fixture_filters_range_and_counts_calls() {
        let bars = session_bars(ts(4, 0), ts(5, 23), Interval::hours(1), 9, 24, |i, _| i as f64);
        let source = FixturePriceSource::new().with_bars("AAPL", bars);

        let got = source
            .bars("AAPL", ts(4, 9), ts(4, 11), Interval::hours(1))
            .await
            .unwrap();
        assert_eq!(got.len(), 3);
        assert_eq!(got[0].timestamp, ts(4, 9));
        assert!(source
            .bars("MSFT", ts(4, 9), ts(4, 11), Interval::hours(1))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_session_bars_skip_weekend_and_night() {
        // 2021-01-08 is a Friday
        let bars = session_bars(ts(8, 0), ts(11, 23), Interval::hours(1), 9, 17, |_, _| 1.0);
        // Friday and Monday, 8 hours each
        assert_eq!(bars.len(), 16);
        assert!(bars.iter().all(|b| (9..17).contains(&b.timestamp.hour())));
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let source = FixturePriceSource::new().fail_after(1, "outage");
        assert!(source
            .bars("AAPL", ts(4, 9), ts(4, 10), Interval::hours(1))
            .await
            .is_ok());
        let err = source
            .bars("AAPL", ts(4, 9), ts(4, 10), Interval::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SentiError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_load_from_json() {
        let raw = r#"{
            "bars": {"AAPL": [{"timestamp": "2021-01-04T09:00:00Z", "open": 1.0, "high": 1.0,
                               "low": 1.0, "close": 1.0, "volume": 10.0}]},
            "exchanges": {"AAPL": "NASDAQ"}
        }"#;
        let source = FixturePriceSource::from_json_str(raw).unwrap();
        assert_eq!(
            source.exchange("AAPL").await.unwrap().as_deref(),
            Some("NASDAQ")
        );
        let news = FixtureNewsSource::from_json_str(
            r#"[{"url": "u", "symbols": ["AAPL"], "title": "t",
                 "published_at": "2021-01-04T08:00:00Z"}]"#,
        )
        .unwrap();
        let got = news
            .news(&["AAPL".to_string()], ts(4, 0), ts(4, 9), 10)
            .await
            .unwrap();
        assert_eq!(got.len(), 1);
        assert!(got[0].paragraphs.is_empty());
    }
}
