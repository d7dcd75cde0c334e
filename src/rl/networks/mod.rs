//! Neural Network Architectures
//!
//! Text and price encoders fused into a Q-network using the Burn framework.

pub mod fusion;
pub mod layers;
pub mod price;
pub mod tensors;
pub mod text;

pub use fusion::{NewsSentiment, QNetworkConfig, TradingQNetwork};
pub use layers::{Activation, DenseStack, LstmStack};
pub use price::{PriceBranch, PriceBranchConfig};
pub use tensors::{argmax_rows, ObservationBatch};
pub use text::{TextBranch, TextBranchConfig};
