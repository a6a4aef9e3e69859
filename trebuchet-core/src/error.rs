use thiserror::Error;

/// Custom error type for the Trebuchet framework.
#[derive(Error, Debug, PartialEq, Clone)] // PartialEq for easier testing
pub enum TrebuchetError {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?} during operation {operation}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
        operation: String,
    },

    #[error("Tensor creation error: data length {data_len} does not match shape {shape:?}")]
    TensorCreationError { data_len: usize, shape: Vec<usize> },

    #[error("Shape mismatch during gradient accumulation: expected {expected:?}, got {actual:?}")]
    GradientAccumulationShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Slice error: {message}")]
    SliceError { message: String },

    #[error("Failed to allocate a buffer of {numel} elements")]
    AllocationFailure { numel: usize },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error("Unknown optimizer: {0}")]
    UnknownOptimizer(String),

    #[error("Node {0} does not exist in this graph")]
    InvalidNode(usize),

    #[error("Operation requires tensor to require grad, but it doesn't.")]
    RequiresGradNotMet,

    #[error("Optimizer needs at least one parameter")]
    EmptyParameterList,

    #[error("Missing required tensor: {0}")]
    MissingTensor(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("Malformed dataset: {0}")]
    DatasetFormat(String),
}

impl TrebuchetError {
    /// Shorthand for a `ShapeMismatch` raised by `operation`.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize], operation: &str) -> Self {
        TrebuchetError::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
            operation: operation.to_string(),
        }
    }
}
