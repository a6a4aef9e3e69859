// src/tensor/mod.rs

use crate::error::TrebuchetError;

pub mod create; // Constructors (zeros, ones, randn, ...)
pub mod utils; // Shape helpers and raw kernels shared with ops

// Re-export creation functions to make them public
pub use create::{full, ones, randn, zeros, zeros_like};

/// Represents a dense, row-major, multi-dimensional array of `f32`.
///
/// A `Tensor` owns its data buffer and, once something has been accumulated
/// into it, a gradient buffer of the same length. Tensors are plain values:
/// graph linkage lives in [`Graph`](crate::autograd::Graph) nodes and shared
/// ownership of learnable tensors goes through [`Parameter`](crate::nn::Parameter).
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    /// The shape (dimensions) of the tensor. `[]` is a scalar.
    pub(crate) shape: Vec<usize>,
    /// Flattened data, `data.len() == shape.iter().product()`.
    pub(crate) data: Vec<f32>,
    /// Gradient buffer, allocated lazily on first accumulation.
    pub(crate) grad: Option<Vec<f32>>,
    /// Whether operations consuming this tensor are differentiated.
    pub(crate) requires_grad: bool,
}

impl Tensor {
    /// Creates a new Tensor with the given f32 data and shape.
    ///
    /// # Errors
    /// Returns `TrebuchetError::TensorCreationError` if the length of `data_vec`
    /// does not match the number of elements described by `shape`.
    pub fn new(data_vec: Vec<f32>, shape: Vec<usize>) -> Result<Self, TrebuchetError> {
        let numel: usize = shape.iter().product();
        if data_vec.len() != numel {
            return Err(TrebuchetError::TensorCreationError {
                data_len: data_vec.len(),
                shape,
            });
        }
        Ok(Tensor {
            shape,
            data: data_vec,
            grad: None,
            requires_grad: false,
        })
    }

    /// Creates a scalar (shape `[]`) tensor.
    pub fn scalar(value: f32) -> Self {
        Tensor {
            shape: Vec::new(),
            data: vec![value],
            grad: None,
            requires_grad: false,
        }
    }

    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the number of elements in the tensor.
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Read-only view of the flattened data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable view of the flattened data.
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor and returns its data buffer.
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// Returns the single value of a one-element tensor.
    pub fn item(&self) -> Result<f32, TrebuchetError> {
        match self.data.as_slice() {
            [value] => Ok(*value),
            _ => Err(TrebuchetError::shape_mismatch(&[], &self.shape, "item")),
        }
    }

    /// Returns the element at the given multi-dimensional index.
    pub fn get(&self, index: &[usize]) -> Result<f32, TrebuchetError> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, d)| i >= d) {
            return Err(TrebuchetError::SliceError {
                message: format!("index {:?} out of bounds for shape {:?}", index, self.shape),
            });
        }
        let offset = index
            .iter()
            .zip(utils::calculate_strides(&self.shape))
            .map(|(i, s)| i * s)
            .sum::<usize>();
        Ok(self.data[offset])
    }

    /// Checks if the tensor requires gradient computation.
    pub fn requires_grad(&self) -> bool {
        self.requires_grad
    }

    /// Sets the `requires_grad` status of this tensor in-place.
    pub fn set_requires_grad(&mut self, requires_grad: bool) {
        self.requires_grad = requires_grad;
    }

    /// Builder-style variant of [`set_requires_grad`](Self::set_requires_grad).
    pub fn with_requires_grad(mut self, requires_grad: bool) -> Self {
        self.requires_grad = requires_grad;
        self
    }

    /// Returns the gradient buffer, if one has been accumulated.
    pub fn grad(&self) -> Option<&[f32]> {
        self.grad.as_deref()
    }

    /// Returns the gradient as a tensor of the same shape, if present.
    pub fn grad_tensor(&self) -> Option<Tensor> {
        self.grad.as_ref().map(|g| Tensor {
            shape: self.shape.clone(),
            data: g.clone(),
            grad: None,
            requires_grad: false,
        })
    }

    /// Adds `grad_to_add` into the gradient buffer, allocating a zeroed buffer first
    /// if none exists yet.
    ///
    /// # Errors
    /// `GradientAccumulationShapeMismatch` if the lengths differ.
    pub fn accumulate_grad(&mut self, grad_to_add: &[f32]) -> Result<(), TrebuchetError> {
        if grad_to_add.len() != self.data.len() {
            return Err(TrebuchetError::GradientAccumulationShapeMismatch {
                expected: self.shape.clone(),
                actual: vec![grad_to_add.len()],
            });
        }
        match self.grad.as_mut() {
            Some(existing) => {
                existing
                    .iter_mut()
                    .zip(grad_to_add)
                    .for_each(|(g, &d)| *g += d);
            }
            None => {
                let mut buffer = utils::alloc_filled(self.data.len(), 0.0)?;
                buffer
                    .iter_mut()
                    .zip(grad_to_add)
                    .for_each(|(g, &d)| *g += d);
                self.grad = Some(buffer);
            }
        }
        Ok(())
    }

    /// Resets an existing gradient buffer to zero. A missing buffer stays missing.
    pub fn zero_grad(&mut self) {
        if let Some(grad) = self.grad.as_mut() {
            grad.fill(0.0);
        }
    }

    /// Drops the gradient buffer entirely.
    pub fn clear_grad(&mut self) {
        self.grad = None;
    }

    /// Fills the data buffer with `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Returns a copy without gradient or `requires_grad`.
    pub fn detach(&self) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.clone(),
            grad: None,
            requires_grad: false,
        }
    }

    /// Copies rows `[start, end)` of the leading axis into a new tensor.
    ///
    /// This is the untracked counterpart of [`slice_op`](crate::ops::view::slice_op),
    /// used to cut mini-batches out of dataset tensors.
    pub fn slice_rows(&self, start: usize, end: usize) -> Result<Tensor, TrebuchetError> {
        let (data, shape) = utils::slice_leading(&self.data, &self.shape, start, end)?;
        Tensor::new(data, shape)
    }

    /// Index of the largest value in each row of a 2-D tensor.
    pub fn argmax_rows(&self) -> Result<Vec<usize>, TrebuchetError> {
        if self.shape.len() != 2 {
            return Err(TrebuchetError::shape_mismatch(&[0, 0], &self.shape, "argmax_rows"));
        }
        let cols = self.shape[1];
        if cols == 0 {
            return Ok(vec![0; self.shape[0]]);
        }
        Ok(self
            .data
            .chunks(cols)
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |(best, best_v), (i, &v)| {
                        if v > best_v {
                            (i, v)
                        } else {
                            (best, best_v)
                        }
                    })
                    .0
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "tensor_test.rs"]
mod tests;
