//! Dataset sources for Trebuchet networks.
//!
//! Every loader produces a pair of row-major tensors: inputs `[samples, features]`
//! and one-hot labels `[samples, classes]`, ready for `Network::train`.

pub mod idx;
pub mod synthetic;

pub use idx::{load_idx_images, load_idx_labels, read_idx_images, read_idx_labels};
pub use synthetic::SyntheticClassification;
