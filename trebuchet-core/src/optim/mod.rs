//! Optimizers for training neural networks.
//!
//! An [`Optimizer`] holds a positional list of [`Parameter`](crate::nn::Parameter)
//! handles and the per-parameter state of its algorithm (SGD with optional
//! momentum, or Adam). The algorithm is picked by name through the registry.

pub mod adam;
pub mod optimizer;
pub mod sgd;

pub use adam::AdamState;
pub use optimizer::{Optimizer, OptimizerConfig, OptimizerKind, OptimizerParams, OptimizerState};
pub use sgd::SgdState;
