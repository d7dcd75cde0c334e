//! Observation Builder
//!
//! Fuses the tokenized symbol, the latest news and the recent price window
//! into one fixed-shape [`ObservationBundle`].

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info_span, Span};

use crate::data::{last_bars, latest_news, NewsSource, PriceSource, Tokenizer};
use crate::domain::Interval;
use crate::error::Result;
use crate::rl::config::EnvConfig;
use crate::rl::core::{
    ObservationBundle, ObservationSpec, PARAGRAPH_TOKENS, PRICE_WINDOW, SYMBOL_TOKENS,
    TITLE_TOKENS,
};

pub struct ObservationBuilder {
    prices: Arc<dyn PriceSource>,
    news: Arc<dyn NewsSource>,
    tokenizer: Arc<dyn Tokenizer>,
    news_limit: usize,
    price_interval: Interval,
    max_lookback_doublings: u32,
    news_max_lookback: Duration,
    spec: ObservationSpec,
    span: Span,
}

impl ObservationBuilder {
    pub fn new(
        prices: Arc<dyn PriceSource>,
        news: Arc<dyn NewsSource>,
        tokenizer: Arc<dyn Tokenizer>,
        config: &EnvConfig,
    ) -> Self {
        let spec = ObservationSpec::new(config.news_limit, tokenizer.vocab_size());
        Self {
            prices,
            news,
            tokenizer,
            news_limit: config.news_limit,
            price_interval: config.price_interval,
            max_lookback_doublings: config.max_lookback_doublings,
            news_max_lookback: Duration::days(config.news_max_lookback_days),
            spec,
            span: info_span!("observer"),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub(crate) fn set_span(&mut self, span: Span) {
        self.span = span;
    }

    pub fn spec(&self) -> ObservationSpec {
        self.spec
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }

    /// Build the observation for `symbol` as of `at`.
    ///
    /// Any provider failure aborts the whole call.
    pub async fn build(&self, symbol: &str, at: DateTime<Utc>) -> Result<ObservationBundle> {
        let symbol_ids = self.tokenizer.encode(symbol, SYMBOL_TOKENS);

        let items = latest_news(
            self.news.as_ref(),
            symbol,
            at,
            self.news_limit,
            self.news_max_lookback,
        )
        .await?;

        let pad = self.tokenizer.pad_id();
        let mut titles = Vec::with_capacity(self.news_limit);
        let mut paragraphs = Vec::with_capacity(self.news_limit);
        for item in items.iter().take(self.news_limit) {
            titles.push(self.tokenizer.encode(&item.title, TITLE_TOKENS));
            let lead = item
                .lead_paragraph()
                .unwrap_or_else(|| self.tokenizer.pad_token());
            paragraphs.push(self.tokenizer.encode(lead, PARAGRAPH_TOKENS));
        }
        titles.resize(self.news_limit, vec![pad; TITLE_TOKENS]);
        paragraphs.resize(self.news_limit, vec![pad; PARAGRAPH_TOKENS]);

        let bars = last_bars(
            self.prices.as_ref(),
            symbol,
            at,
            PRICE_WINDOW,
            self.price_interval,
            self.max_lookback_doublings,
        )
        .await?;

        let bundle = ObservationBundle {
            symbol: symbol_ids,
            titles,
            paragraphs,
            prices: bars.iter().map(|b| b.features()).collect(),
        };
        self.spec.validate(&bundle)?;

        debug!(
            parent: &self.span,
            symbol,
            %at,
            articles = items.len(),
            "observation built"
        );
        Ok(bundle)
    }
}
