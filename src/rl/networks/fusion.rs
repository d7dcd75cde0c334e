//! News sentiment fusion and the Q-value head.

use burn::prelude::*;

use super::layers::{check_widths, Activation, DenseStack};
use super::price::{PriceBranch, PriceBranchConfig};
use super::tensors::ObservationBatch;
use super::text::{TextBranch, TextBranchConfig};
use crate::error::SentiError;

/// Full network configuration
#[derive(Config, Debug)]
pub struct QNetworkConfig {
    #[config(default = "TextBranchConfig::new()")]
    pub title: TextBranchConfig,
    #[config(default = "TextBranchConfig::new()")]
    pub paragraph: TextBranchConfig,
    #[config(default = "PriceBranchConfig::new()")]
    pub price: PriceBranchConfig,
    /// Dense widths after the article mean; the last layer is sigmoid
    #[config(default = "vec![16, 8]")]
    pub sentiment_units: Vec<usize>,
    /// ReLU widths before the action layer
    #[config(default = "vec![16]")]
    pub head_units: Vec<usize>,
    /// 2 without neutrality, 3 with HOLD
    #[config(default = "2")]
    pub num_actions: usize,
}

impl Default for QNetworkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl QNetworkConfig {
    /// Same architecture with both text branches sized for `vocab_size`
    pub fn sized_for(mut self, vocab_size: usize, num_actions: usize) -> Self {
        self.title.vocab_size = vocab_size;
        self.paragraph.vocab_size = vocab_size;
        self.num_actions = num_actions;
        self
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        let mut errors = Vec::new();
        self.title.collect_errors("title", &mut errors);
        self.paragraph.collect_errors("paragraph", &mut errors);
        self.price.collect_errors(&mut errors);
        check_widths("sentiment_units", &self.sentiment_units, &mut errors);
        check_widths("head_units", &self.head_units, &mut errors);
        if !(2..=3).contains(&self.num_actions) {
            errors.push(format!("num_actions must be 2 or 3, got {}", self.num_actions));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SentiError::Configuration(errors.join("; ")))
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> crate::error::Result<TradingQNetwork<B>> {
        self.validate()?;

        let title = self.title.init(device);
        let paragraph = self.paragraph.init(device);
        let sentiment_head = DenseStack::new(
            title.output_dim() + paragraph.output_dim(),
            &self.sentiment_units,
            Activation::Relu,
            Activation::Sigmoid,
            device,
        );
        let sentiment = NewsSentiment {
            title,
            paragraph,
            head: sentiment_head,
        };

        let price = self.price.init(device);

        let mut head_widths = self.head_units.clone();
        head_widths.push(self.num_actions);
        let head = DenseStack::new(
            sentiment.output_dim() + price.output_dim(),
            &head_widths,
            Activation::Relu,
            Activation::Sigmoid,
            device,
        );

        Ok(TradingQNetwork {
            sentiment,
            price,
            head,
        })
    }
}

/// Per-symbol sentiment vector from the article titles and bodies
#[derive(Module, Debug)]
pub struct NewsSentiment<B: Backend> {
    title: TextBranch<B>,
    paragraph: TextBranch<B>,
    head: DenseStack<B>,
}

impl<B: Backend> NewsSentiment<B> {
    /// `[b, a, title_len]` and `[b, a, paragraph_len]` to `[b, output_dim]`
    pub fn forward(&self, titles: Tensor<B, 3, Int>, paragraphs: Tensor<B, 3, Int>) -> Tensor<B, 2> {
        let [batch, articles, title_len] = titles.dims();
        let [_, _, paragraph_len] = paragraphs.dims();

        let title_emb = self
            .title
            .forward(titles.reshape([batch * articles, title_len]))
            .reshape([batch, articles, self.title.output_dim()]);
        let paragraph_emb = self
            .paragraph
            .forward(paragraphs.reshape([batch * articles, paragraph_len]))
            .reshape([batch, articles, self.paragraph.output_dim()]);

        let joined = Tensor::cat(vec![title_emb, paragraph_emb], 2);
        let width = joined.dims()[2];
        let pooled = joined.mean_dim(1).reshape([batch, width]);
        self.head.forward(pooled)
    }

    /// One `([a_i, title_len], [a_i, paragraph_len])` pair per symbol, with a
    /// different article count allowed for each
    pub fn forward_ragged(&self, articles: Vec<(Tensor<B, 2, Int>, Tensor<B, 2, Int>)>) -> Tensor<B, 2> {
        let pooled: Vec<Tensor<B, 2>> = articles
            .into_iter()
            .map(|(titles, paragraphs)| {
                let joined = Tensor::cat(
                    vec![self.title.forward(titles), self.paragraph.forward(paragraphs)],
                    1,
                );
                joined.mean_dim(0)
            })
            .collect();
        self.head.forward(Tensor::cat(pooled, 0))
    }

    pub fn output_dim(&self) -> usize {
        self.head.output_dim()
    }
}

/// Scores every trading action in `[0, 1]`
#[derive(Module, Debug)]
pub struct TradingQNetwork<B: Backend> {
    sentiment: NewsSentiment<B>,
    price: PriceBranch<B>,
    head: DenseStack<B>,
}

impl<B: Backend> TradingQNetwork<B> {
    /// `[batch, num_actions]`
    pub fn forward(&self, batch: &ObservationBatch<B>) -> Tensor<B, 2> {
        let sentiment = self
            .sentiment
            .forward(batch.titles.clone(), batch.paragraphs.clone());
        let price = self.price.forward(batch.prices.clone());
        self.head.forward(Tensor::cat(vec![sentiment, price], 1))
    }

    pub fn sentiment(&self) -> &NewsSentiment<B> {
        &self.sentiment
    }

    pub fn num_actions(&self) -> usize {
        self.head.output_dim()
    }
}
