//! A small eager-mode training engine: tensors, differentiable operations,
//! reverse-mode autograd over a per-step graph arena, layers, networks and
//! optimizers.

pub mod autograd;
pub mod error;
pub mod nn;
pub mod ops;
pub mod optim;
pub mod registry;
pub mod tensor;
pub mod utils;

pub use autograd::{Graph, NodeId};
pub use error::TrebuchetError;
pub use nn::{Layer, LayerConfig, Network, Parameter, TrainConfig, TrainingHistory};
pub use optim::{Optimizer, OptimizerConfig};
pub use registry::Registry;
pub use tensor::Tensor;
