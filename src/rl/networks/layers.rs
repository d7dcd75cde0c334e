//! Building blocks shared by the network branches.

use burn::nn::{Linear, LinearConfig, Lstm, LstmConfig};
use burn::prelude::*;
use burn::tensor::activation;
use serde::{Deserialize, Serialize};

/// Elementwise activation selectable from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Sigmoid,
    Tanh,
    Linear,
}

impl Activation {
    // Modules keep plain constants, so the activation is stored as a code
    fn code(self) -> usize {
        match self {
            Self::Relu => 0,
            Self::Sigmoid => 1,
            Self::Tanh => 2,
            Self::Linear => 3,
        }
    }

    fn from_code(code: usize) -> Self {
        match code {
            0 => Self::Relu,
            1 => Self::Sigmoid,
            2 => Self::Tanh,
            _ => Self::Linear,
        }
    }

    pub fn apply<B: Backend, const D: usize>(self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Self::Relu => activation::relu(x),
            Self::Sigmoid => activation::sigmoid(x),
            Self::Tanh => activation::tanh(x),
            Self::Linear => x,
        }
    }
}

/// Fully connected layers with one activation between layers and another
/// after the last one
#[derive(Module, Debug)]
pub struct DenseStack<B: Backend> {
    layers: Vec<Linear<B>>,
    hidden_activation: usize,
    output_activation: usize,
    output_dim: usize,
}

impl<B: Backend> DenseStack<B> {
    pub fn new(
        input_dim: usize,
        widths: &[usize],
        hidden: Activation,
        output: Activation,
        device: &B::Device,
    ) -> Self {
        let mut layers = Vec::with_capacity(widths.len());
        let mut d_in = input_dim;
        for &width in widths {
            layers.push(LinearConfig::new(d_in, width).init(device));
            d_in = width;
        }

        Self {
            layers,
            hidden_activation: hidden.code(),
            output_activation: output.code(),
            output_dim: d_in,
        }
    }

    pub fn forward<const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let last = self.layers.len().saturating_sub(1);
        let mut x = x;
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            let act = if i == last {
                self.output_activation
            } else {
                self.hidden_activation
            };
            x = Activation::from_code(act).apply(x);
        }
        x
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }
}

/// Stacked LSTMs. Every layer sees the full sequence of the previous one;
/// the output is the last time step of the top layer.
#[derive(Module, Debug)]
pub struct LstmStack<B: Backend> {
    layers: Vec<Lstm<B>>,
    output_dim: usize,
}

impl<B: Backend> LstmStack<B> {
    pub fn new(input_dim: usize, units: &[usize], device: &B::Device) -> Self {
        let mut layers = Vec::with_capacity(units.len());
        let mut d_in = input_dim;
        for &hidden in units {
            layers.push(LstmConfig::new(d_in, hidden, true).init(device));
            d_in = hidden;
        }
        Self {
            layers,
            output_dim: d_in,
        }
    }

    /// `[batch, seq, features]` to `[batch, units]`
    pub fn forward(&self, x: Tensor<B, 3>) -> Tensor<B, 2> {
        let mut seq = x;
        for layer in &self.layers {
            let (output, _state) = layer.forward(seq, None);
            seq = output;
        }

        let [batch, steps, width] = seq.dims();
        seq.slice([0..batch, steps - 1..steps, 0..width])
            .reshape([batch, width])
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }
}

/// Widths of a dense stack with an optional final projection
pub(crate) fn stack_widths(dense_units: &[usize], last_units: Option<usize>) -> Vec<usize> {
    let mut widths = dense_units.to_vec();
    widths.extend(last_units);
    widths
}

/// Non-empty, non-zero check used by the network configs
pub(crate) fn check_widths(name: &str, widths: &[usize], errors: &mut Vec<String>) {
    if widths.is_empty() {
        errors.push(format!("{} must not be empty", name));
    } else if widths.contains(&0) {
        errors.push(format!("{} must not contain zero widths: {:?}", name, widths));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_dense_stack_shapes_and_sigmoid_bound() {
        let device = Default::default();
        let dense = DenseStack::<TestBackend>::new(
            8,
            &[16, 3],
            Activation::Relu,
            Activation::Sigmoid,
            &device,
        );
        assert_eq!(dense.output_dim(), 3);

        let input = Tensor::<TestBackend, 2>::random(
            [4, 8],
            burn::tensor::Distribution::Normal(0.0, 5.0),
            &device,
        );
        let output = dense.forward(input);
        assert_eq!(output.dims(), [4, 3]);
        let values = output.into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_lstm_stack_collapses_sequence() {
        let device = Default::default();
        let lstm = LstmStack::<TestBackend>::new(7, &[12, 6], &device);
        let input = Tensor::<TestBackend, 3>::zeros([2, 50, 7], &device);
        assert_eq!(lstm.forward(input).dims(), [2, 6]);
        assert_eq!(lstm.output_dim(), 6);
    }

    #[test]
    fn test_activation_codes_roundtrip() {
        for act in [
            Activation::Relu,
            Activation::Sigmoid,
            Activation::Tanh,
            Activation::Linear,
        ] {
            assert_eq!(Activation::from_code(act.code()), act);
        }
    }

    #[test]
    fn test_check_widths() {
        let mut errors = Vec::new();
        check_widths("a", &[], &mut errors);
        check_widths("b", &[3, 0], &mut errors);
        check_widths("c", &[3], &mut errors);
        assert_eq!(errors.len(), 2);
        assert_eq!(stack_widths(&[8], Some(4)), vec![8, 4]);
    }
}
