use crate::error::TrebuchetError;
use crate::tensor::Tensor;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A learnable tensor shared between the layer that owns it and the
/// optimizers that update it.
///
/// Cloning a `Parameter` clones the handle, not the tensor. The wrapped
/// tensor always has `requires_grad == true`.
#[derive(Clone)]
pub struct Parameter {
    tensor: Arc<RwLock<Tensor>>,
    name: Option<String>,
}

impl Parameter {
    /// Creates a new Parameter from a Tensor.
    /// Ensures that the underlying Tensor requires gradients.
    pub fn new(tensor: Tensor, name: Option<String>) -> Self {
        Parameter {
            tensor: Arc::new(RwLock::new(tensor.with_requires_grad(true))),
            name,
        }
    }

    /// Shorthand for a parameter with a name.
    pub fn named(tensor: Tensor, name: impl Into<String>) -> Self {
        Self::new(tensor, Some(name.into()))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Identity of the shared tensor; equal for all clones of one parameter.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.tensor) as usize
    }

    /// Acquires a read lock on the underlying tensor.
    pub fn read(&self) -> RwLockReadGuard<'_, Tensor> {
        self.tensor.read().expect("RwLock poisoned")
    }

    /// Acquires a write lock on the underlying tensor.
    pub fn write(&self) -> RwLockWriteGuard<'_, Tensor> {
        self.tensor.write().expect("RwLock poisoned")
    }

    pub fn shape(&self) -> Vec<usize> {
        self.read().shape().to_vec()
    }

    pub fn numel(&self) -> usize {
        self.read().numel()
    }

    /// Copy of the current values, without gradient.
    pub fn snapshot(&self) -> Tensor {
        self.read().detach()
    }

    /// Copy of the accumulated gradient, if any.
    pub fn grad(&self) -> Option<Vec<f32>> {
        self.read().grad().map(|g| g.to_vec())
    }

    pub fn accumulate_grad(&self, grad: &[f32]) -> Result<(), TrebuchetError> {
        self.write().accumulate_grad(grad)
    }

    /// Resets an existing gradient to zero; an absent gradient stays absent.
    pub fn zero_grad(&self) {
        self.write().zero_grad();
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tensor, &other.tensor)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tensor = self.read();
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("shape", &tensor.shape())
            .field("has_grad", &tensor.grad().is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "parameter_test.rs"]
mod tests;
