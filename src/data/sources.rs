//! Provider seams for price bars, news and tokenization.
//!
//! Everything the environment needs from the outside world goes through
//! these traits so that live adapters and recorded fixtures are
//! interchangeable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Bar, Interval, NewsItem};
use crate::error::Result;

/// Market-data provider returning OHLCV bars
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Bars for `symbol` with timestamps in `[start, end]`, ascending.
    async fn bars(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> Result<Vec<Bar>>;

    /// Listing exchange of `symbol`, `None` when the provider does not know it.
    async fn exchange(&self, symbol: &str) -> Result<Option<String>>;
}

/// News provider returning articles newest first
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn news(
        &self,
        symbols: &[String],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<NewsItem>>;
}

/// Text to fixed-length id sequence.
///
/// Sequences are pre-padded and pre-truncated: the last `max_len` ids are
/// kept and padding goes in front.
pub trait Tokenizer: Send + Sync {
    fn vocab_size(&self) -> usize;

    fn pad_id(&self) -> u32;

    /// Literal text that encodes to an all-pad sequence
    fn pad_token(&self) -> &str;

    fn encode(&self, text: &str, max_len: usize) -> Vec<u32>;

    fn encode_batch(&self, texts: &[&str], max_len: usize) -> Vec<Vec<u32>> {
        texts.iter().map(|t| self.encode(t, max_len)).collect()
    }
}
