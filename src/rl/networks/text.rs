//! Text Branch
//!
//! Encodes one token sequence per article into a fixed-size embedding.

use burn::nn::{Embedding, EmbeddingConfig};
use burn::prelude::*;

use super::layers::{check_widths, stack_widths, Activation, DenseStack, LstmStack};

/// Text encoder configuration
#[derive(Config, Debug)]
pub struct TextBranchConfig {
    /// Tokenizer vocabulary size
    #[config(default = "30_522")]
    pub vocab_size: usize,
    #[config(default = "32")]
    pub embed_dim: usize,
    /// Hidden size of each stacked LSTM
    #[config(default = "vec![32]")]
    pub lstm_units: Vec<usize>,
    /// ReLU dense layers after the LSTMs
    #[config(default = "vec![16]")]
    pub dense_units: Vec<usize>,
    /// Width of the final linear projection, if any
    #[config(default = "None")]
    pub last_units: Option<usize>,
}

impl Default for TextBranchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl TextBranchConfig {
    pub fn output_dim(&self) -> usize {
        stack_widths(&self.dense_units, self.last_units)
            .last()
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn collect_errors(&self, name: &str, errors: &mut Vec<String>) {
        if self.vocab_size == 0 {
            errors.push(format!("{}.vocab_size must be positive", name));
        }
        if self.embed_dim == 0 {
            errors.push(format!("{}.embed_dim must be positive", name));
        }
        check_widths(&format!("{}.lstm_units", name), &self.lstm_units, errors);
        check_widths(&format!("{}.dense_units", name), &self.dense_units, errors);
        if self.last_units == Some(0) {
            errors.push(format!("{}.last_units must be positive when set", name));
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> TextBranch<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device);
        let lstm = LstmStack::new(self.embed_dim, &self.lstm_units, device);
        let dense = DenseStack::new(
            lstm.output_dim(),
            &stack_widths(&self.dense_units, self.last_units),
            Activation::Relu,
            Activation::Linear,
            device,
        );

        TextBranch {
            embedding,
            lstm,
            dense,
        }
    }
}

/// Embedding, stacked LSTMs, dense projection
#[derive(Module, Debug)]
pub struct TextBranch<B: Backend> {
    embedding: Embedding<B>,
    lstm: LstmStack<B>,
    dense: DenseStack<B>,
}

impl<B: Backend> TextBranch<B> {
    /// `[n, seq]` token ids to `[n, output_dim]`
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let embedded = self.embedding.forward(tokens);
        let encoded = self.lstm.forward(embedded);
        self.dense.forward(encoded)
    }

    pub fn output_dim(&self) -> usize {
        self.dense.output_dim()
    }
}
