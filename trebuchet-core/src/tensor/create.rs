// src/tensor/create.rs

use crate::error::TrebuchetError;
use crate::tensor::utils::alloc_filled;
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Creates a new tensor filled with zeros with the specified shape.
pub fn zeros(shape: &[usize]) -> Result<Tensor, TrebuchetError> {
    full(shape, 0.0)
}

/// Creates a new tensor filled with ones with the specified shape.
pub fn ones(shape: &[usize]) -> Result<Tensor, TrebuchetError> {
    full(shape, 1.0)
}

/// Creates a new tensor filled with a specific value with the specified shape.
pub fn full(shape: &[usize], value: f32) -> Result<Tensor, TrebuchetError> {
    let numel = shape.iter().product();
    let data_vec = alloc_filled(numel, value)?;
    Tensor::new(data_vec, shape.to_vec())
}

/// Creates a new tensor filled with zeros, having the same shape as the input tensor.
pub fn zeros_like(tensor: &Tensor) -> Result<Tensor, TrebuchetError> {
    zeros(tensor.shape())
}

/// Creates a tensor of standard-normal samples drawn from a generator seeded with `seed`.
///
/// The same `(shape, seed)` pair always yields the same values.
pub fn randn(shape: &[usize], seed: u64) -> Result<Tensor, TrebuchetError> {
    let numel: usize = shape.iter().product();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data_vec = alloc_filled(numel, 0.0)?;
    for value in data_vec.iter_mut() {
        *value = StandardNormal.sample(&mut rng);
    }
    Tensor::new(data_vec, shape.to_vec())
}

#[cfg(test)]
#[path = "create_test.rs"]
mod tests;
