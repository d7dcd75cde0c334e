//! Price Branch
//!
//! Encodes the `[PRICE_WINDOW, PRICE_FIELDS]` price window into an embedding.

use burn::prelude::*;

use super::layers::{check_widths, stack_widths, Activation, DenseStack, LstmStack};
use crate::rl::core::PRICE_FIELDS;

/// Price encoder configuration
#[derive(Config, Debug)]
pub struct PriceBranchConfig {
    #[config(default = "vec![32]")]
    pub lstm_units: Vec<usize>,
    #[config(default = "vec![16]")]
    pub dense_units: Vec<usize>,
    #[config(default = "None")]
    pub last_units: Option<usize>,
    /// Activation between dense layers
    #[config(default = "Activation::Relu")]
    pub activation: Activation,
    /// Activation after the last dense layer
    #[config(default = "Activation::Linear")]
    pub output_activation: Activation,
}

impl Default for PriceBranchConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceBranchConfig {
    pub fn output_dim(&self) -> usize {
        stack_widths(&self.dense_units, self.last_units)
            .last()
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn collect_errors(&self, errors: &mut Vec<String>) {
        check_widths("price.lstm_units", &self.lstm_units, errors);
        check_widths("price.dense_units", &self.dense_units, errors);
        if self.last_units == Some(0) {
            errors.push("price.last_units must be positive when set".to_string());
        }
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> PriceBranch<B> {
        let lstm = LstmStack::new(PRICE_FIELDS, &self.lstm_units, device);
        let dense = DenseStack::new(
            lstm.output_dim(),
            &stack_widths(&self.dense_units, self.last_units),
            self.activation,
            self.output_activation,
            device,
        );
        PriceBranch { lstm, dense }
    }
}

#[derive(Module, Debug)]
pub struct PriceBranch<B: Backend> {
    lstm: LstmStack<B>,
    dense: DenseStack<B>,
}

impl<B: Backend> PriceBranch<B> {
    /// `[batch, window, PRICE_FIELDS]` to `[batch, output_dim]`
    pub fn forward(&self, prices: Tensor<B, 3>) -> Tensor<B, 2> {
        self.dense.forward(self.lstm.forward(prices))
    }

    pub fn output_dim(&self) -> usize {
        self.dense.output_dim()
    }
}
