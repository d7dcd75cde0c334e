//! Market Clock
//!
//! Simulated time for the trading environment. The cursor moves by a fixed
//! step, stays inside the configured trading session of its calendar day and
//! skips calendar gaps by probing the price source for activity.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info_span, warn, Span};

use crate::data::{has_data_around, PriceSource};
use crate::domain::Interval;
use crate::error::{Result, SentiError};
use crate::rl::config::{EnvConfig, SessionWindow};

pub struct MarketClock {
    prices: Arc<dyn PriceSource>,
    probe_symbol: String,
    probe_interval: Interval,
    start: DateTime<Utc>,
    /// `start` snapped into its session and moved to the first day with data
    aligned_start: DateTime<Utc>,
    stop: DateTime<Utc>,
    step: Duration,
    session: SessionWindow,
    max_gap_days: u32,
    cursor: DateTime<Utc>,
    span: Span,
}

impl MarketClock {
    /// Unseeded clock; call [`MarketClock::seed`] before use
    pub fn new(prices: Arc<dyn PriceSource>, config: &EnvConfig) -> Self {
        let span = info_span!("clock", symbol = %config.probe_symbol());
        Self {
            prices,
            probe_symbol: config.probe_symbol().to_string(),
            probe_interval: config.price_interval,
            start: config.start,
            aligned_start: config.start,
            stop: config.stop,
            step: config.step.duration(),
            session: config.session,
            max_gap_days: config.max_gap_days,
            cursor: config.start,
            span,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub(crate) fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    /// Align `start` with its session and find the first instant with data
    pub async fn seed(&mut self) -> Result<DateTime<Utc>> {
        let snapped = self.snap(self.start);
        if snapped > self.stop {
            return Err(SentiError::Configuration(format!(
                "no trading session between {} and {}",
                self.start, self.stop
            )));
        }

        self.aligned_start = snapped;
        let seeded = self.probe(snapped).await?;
        self.aligned_start = seeded;
        self.cursor = seeded;

        debug!(parent: &self.span, cursor = %self.cursor, "clock seeded");
        Ok(self.cursor)
    }

    /// Move one step forward, returning the new cursor
    pub async fn advance(&mut self) -> Result<DateTime<Utc>> {
        let mut next = self.cursor + self.step;
        if next > self.stop || next < self.start {
            next = self.aligned_start;
        }

        next = self.snap(next);
        if next > self.stop {
            next = self.aligned_start;
        }

        self.cursor = self.probe(next).await?;
        debug!(parent: &self.span, cursor = %self.cursor, "clock advanced");
        Ok(self.cursor)
    }

    /// Back to the aligned start
    pub fn rewind(&mut self) {
        debug!(parent: &self.span, from = %self.cursor, to = %self.aligned_start, "clock rewound");
        self.cursor = self.aligned_start;
    }

    pub fn cursor(&self) -> DateTime<Utc> {
        self.cursor
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.aligned_start
    }

    pub fn stop(&self) -> DateTime<Utc> {
        self.stop
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn session(&self) -> SessionWindow {
        self.session
    }

    /// Whether `n` more steps would move past `stop`; overflow counts as crossing
    pub fn would_cross_stop(&self, n: usize) -> bool {
        let horizon = i32::try_from(n)
            .ok()
            .and_then(|n| self.step.checked_mul(n))
            .and_then(|span| self.cursor.checked_add_signed(span));
        match horizon {
            Some(at) => at > self.stop,
            None => true,
        }
    }

    /// Snap into the session of `at`'s day, or the next day's open past close
    fn snap(&self, at: DateTime<Utc>) -> DateTime<Utc> {
        let day = at.date_naive();
        if at < self.session.open_on(day) {
            self.session.open_on(day)
        } else if at >= self.session.close_on(day) {
            match day.succ_opt() {
                Some(next) => self.session.open_on(next),
                None => self.session.open_on(day),
            }
        } else {
            at
        }
    }

    /// First instant from `from` (one day at a time) with bars around it
    async fn probe(&self, from: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let mut at = from;
        for skipped in 0..=self.max_gap_days {
            if has_data_around(
                self.prices.as_ref(),
                &self.probe_symbol,
                at,
                self.step,
                self.probe_interval,
            )
            .await?
            {
                if skipped > 0 {
                    debug!(parent: &self.span, skipped, cursor = %at, "skipped days without data");
                }
                return Ok(at);
            }

            at += Duration::days(1);
            if at > self.stop {
                at = self.aligned_start;
            }
        }

        warn!(
            parent: &self.span,
            from = %from,
            max_gap_days = self.max_gap_days,
            "no price data found"
        );
        Err(SentiError::NoData {
            symbol: self.probe_symbol.clone(),
            at: from,
            searched_days: i64::from(self.max_gap_days),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{session_bars, FixturePriceSource};
    use chrono::{TimeZone, Timelike};

    fn ts(m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, m, d, h, 0, 0).unwrap()
    }

    fn config(start: DateTime<Utc>, stop: DateTime<Utc>) -> EnvConfig {
        EnvConfig {
            start,
            stop,
            ..Default::default()
        }
    }

    fn weekday_source() -> Arc<FixturePriceSource> {
        let bars = session_bars(ts(1, 1, 0), ts(2, 28, 23), Interval::hours(1), 9, 24, |_, _| 1.0);
        Arc::new(FixturePriceSource::new().with_bars("AAPL", bars))
    }

    #[tokio::test]
    async fn test_seed_snaps_to_open() {
        let mut clock = MarketClock::new(weekday_source(), &config(ts(1, 4, 3), ts(1, 8, 0)));
        assert_eq!(clock.seed().await.unwrap(), ts(1, 4, 9));
    }

    #[tokio::test]
    async fn test_seed_skips_weekend() {
        // 2021-01-02 is a Saturday
        let mut clock = MarketClock::new(weekday_source(), &config(ts(1, 2, 12), ts(1, 8, 0)));
        assert_eq!(clock.seed().await.unwrap(), ts(1, 4, 12));
    }

    #[tokio::test]
    async fn test_advance_rolls_past_close_and_weekend() {
        let mut clock = MarketClock::new(weekday_source(), &config(ts(1, 8, 22), ts(1, 15, 0)));
        clock.seed().await.unwrap();
        assert_eq!(clock.advance().await.unwrap(), ts(1, 8, 23));
        // midnight close: Saturday open, no data until Monday
        assert_eq!(clock.advance().await.unwrap(), ts(1, 11, 9));
    }

    #[tokio::test]
    async fn test_advance_wraps_past_stop() {
        let mut clock = MarketClock::new(weekday_source(), &config(ts(1, 4, 9), ts(1, 4, 11)));
        clock.seed().await.unwrap();
        clock.advance().await.unwrap();
        clock.advance().await.unwrap();
        assert_eq!(clock.cursor(), ts(1, 4, 11));
        assert_eq!(clock.advance().await.unwrap(), ts(1, 4, 9));
    }

    #[tokio::test]
    async fn test_cursor_invariants_hold() {
        let mut clock = MarketClock::new(weekday_source(), &config(ts(1, 4, 9), ts(1, 20, 9)));
        clock.seed().await.unwrap();
        for _ in 0..200 {
            let cursor = clock.advance().await.unwrap();
            assert!(cursor >= ts(1, 4, 9) && cursor <= ts(1, 20, 9));
            assert!(cursor.hour() >= 9);
        }
    }

    #[tokio::test]
    async fn test_gap_probe_is_bounded() {
        let source = Arc::new(FixturePriceSource::new());
        let mut clock = MarketClock::new(source.clone(), &config(ts(1, 4, 9), ts(3, 1, 9)));
        let err = clock.seed().await.unwrap_err();
        assert!(err.is_no_data());
        assert_eq!(source.calls(), 11);
    }

    #[tokio::test]
    async fn test_would_cross_stop() {
        let mut clock = MarketClock::new(weekday_source(), &config(ts(1, 4, 9), ts(1, 4, 12)));
        clock.seed().await.unwrap();
        assert!(!clock.would_cross_stop(3));
        assert!(clock.would_cross_stop(4));
        clock.advance().await.unwrap();
        clock.rewind();
        assert_eq!(clock.cursor(), ts(1, 4, 9));
    }

    #[tokio::test]
    async fn test_would_cross_stop_on_overflow() {
        let mut clock = MarketClock::new(weekday_source(), &config(ts(1, 4, 9), ts(1, 4, 12)));
        clock.seed().await.unwrap();
        assert!(clock.would_cross_stop(usize::MAX));
        assert!(clock.would_cross_stop(i32::MAX as usize));
    }

    #[tokio::test]
    async fn test_cursor_stays_inside_closing_session() {
        let bars = session_bars(ts(1, 1, 0), ts(2, 28, 23), Interval::hours(1), 9, 16, |_, _| 1.0);
        let source = Arc::new(FixturePriceSource::new().with_bars("AAPL", bars));
        let env = EnvConfig {
            session: SessionWindow {
                open_hour: 9,
                close_hour: 16,
            },
            ..config(ts(1, 4, 9), ts(1, 29, 9))
        };
        let mut clock = MarketClock::new(source, &env);
        clock.seed().await.unwrap();
        for _ in 0..300 {
            let cursor = clock.advance().await.unwrap();
            assert!(cursor >= ts(1, 4, 9) && cursor <= ts(1, 29, 9));
            assert!((9..16).contains(&cursor.hour()), "cursor {} outside 9-16", cursor);
        }
    }
}
