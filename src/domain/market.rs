use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Result, SentiError};

/// Number of numeric fields per bar fed to the network (OHLCV + 2 derived)
pub const BAR_FIELDS: usize = 7;

/// One OHLCV price record for a symbol at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// Trade count for the bar. Not all providers supply this.
    #[serde(default)]
    pub trade_count: Option<u64>,
    /// Volume-weighted average price. Not all providers supply this.
    #[serde(default)]
    pub vwap: Option<f64>,
}

impl Bar {
    /// Bar with only a close price, handy for fixtures
    pub fn flat(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
            trade_count: None,
            vwap: None,
        }
    }

    /// Numeric row in network order: open, high, low, close, volume, trade_count, vwap
    pub fn features(&self) -> [f32; BAR_FIELDS] {
        [
            self.open as f32,
            self.high as f32,
            self.low as f32,
            self.close as f32,
            self.volume as f32,
            self.trade_count.unwrap_or(0) as f32,
            self.vwap.unwrap_or(0.0) as f32,
        ]
    }
}

/// Unit of a bar interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    Minute,
    Hour,
    Day,
    Week,
    Month,
}

/// Bar interval such as `15m`, `1h`, `1d`, `1wk`, `3mo`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    pub amount: u32,
    pub unit: IntervalUnit,
}

/// Interval strings accepted in configuration
pub const SUPPORTED_INTERVALS: [&str; 13] = [
    "1m", "2m", "5m", "15m", "30m", "60m", "90m", "1h", "1d", "5d", "1wk", "1mo", "3mo",
];

impl Interval {
    pub const fn new(amount: u32, unit: IntervalUnit) -> Self {
        Self { amount, unit }
    }

    pub const fn hours(amount: u32) -> Self {
        Self::new(amount, IntervalUnit::Hour)
    }

    pub const fn minutes(amount: u32) -> Self {
        Self::new(amount, IntervalUnit::Minute)
    }

    pub const fn days(amount: u32) -> Self {
        Self::new(amount, IntervalUnit::Day)
    }

    /// Parse and check against the configuration whitelist
    pub fn supported(raw: &str) -> Result<Self> {
        let interval: Interval = raw.parse()?;
        if !SUPPORTED_INTERVALS.contains(&interval.to_string().as_str()) {
            return Err(SentiError::Configuration(format!(
                "interval '{}' is not supported, expected one of {:?}",
                raw, SUPPORTED_INTERVALS
            )));
        }
        Ok(interval)
    }

    /// Wall-clock length (a month counts as 30 days)
    pub fn duration(&self) -> Duration {
        let amount = i64::from(self.amount);
        match self.unit {
            IntervalUnit::Minute => Duration::minutes(amount),
            IntervalUnit::Hour => Duration::hours(amount),
            IntervalUnit::Day => Duration::days(amount),
            IntervalUnit::Week => Duration::weeks(amount),
            IntervalUnit::Month => Duration::days(30 * amount),
        }
    }

    /// Initial lookback window expected to hold `n` bars of this interval.
    ///
    /// Deliberately generous for intraday units because bars only exist
    /// during trading sessions.
    pub fn lookback(&self, n: usize) -> Duration {
        let n = n as i64;
        let amount = i64::from(self.amount);
        match self.unit {
            IntervalUnit::Minute => Duration::hours(((amount % 60) + 1) * 3),
            IntervalUnit::Hour => Duration::days(((amount % 24) + 1) * 3),
            IntervalUnit::Day | IntervalUnit::Week => Duration::days(n * 7 * amount),
            IntervalUnit::Month => Duration::days(n * 60),
        }
        .max(self.duration() * (n as i32).max(1))
    }

    fn suffix(&self) -> &'static str {
        match self.unit {
            IntervalUnit::Minute => "m",
            IntervalUnit::Hour => "h",
            IntervalUnit::Day => "d",
            IntervalUnit::Week => "wk",
            IntervalUnit::Month => "mo",
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.amount, self.suffix())
    }
}

impl FromStr for Interval {
    type Err = SentiError;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let split = raw
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| SentiError::Configuration(format!("interval '{}' has no unit", raw)))?;
        let (digits, unit) = raw.split_at(split);

        let amount: u32 = digits.parse().map_err(|_| {
            SentiError::Configuration(format!("interval '{}' has no amount", raw))
        })?;
        if amount == 0 {
            return Err(SentiError::Configuration(format!(
                "interval '{}' must be positive",
                raw
            )));
        }

        // `M` (upper case) is the provider spelling of months
        let unit = match unit {
            "m" | "min" => IntervalUnit::Minute,
            "h" => IntervalUnit::Hour,
            "d" => IntervalUnit::Day,
            "wk" | "w" => IntervalUnit::Week,
            "mo" | "M" => IntervalUnit::Month,
            other => {
                return Err(SentiError::Configuration(format!(
                    "interval unit '{}' not supported, only m, h, d, wk, mo/M",
                    other
                )))
            }
        };

        Ok(Self { amount, unit })
    }
}

impl TryFrom<String> for Interval {
    type Error = SentiError;

    fn try_from(raw: String) -> Result<Self> {
        raw.parse()
    }
}

impl From<Interval> for String {
    fn from(interval: Interval) -> Self {
        interval.to_string()
    }
}
