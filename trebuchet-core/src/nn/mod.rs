//! Layers, parameters and the sequential network with its training loop.

pub mod layer;
pub mod network;
pub mod parameter;

pub use layer::{Activation, Layer, LayerConfig, LayerKind, LayerParams, Linear, LossKind, LossLayer};
pub use network::{EpochStats, Network, TrainConfig, TrainingHistory};
pub use parameter::Parameter;
