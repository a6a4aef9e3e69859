use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::tensor::Tensor;
use approx::relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Error type specifically for gradient checking failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradCheckError {
    #[error("Gradient check failed for input tensor at index {input_index}, element index {element_index}: Analytical grad {analytical_grad:?} != Numerical grad {numerical_grad:?}. Difference: {difference:?}")]
    GradientMismatch {
        input_index: usize,
        element_index: usize,
        analytical_grad: f64,
        numerical_grad: f64,
        difference: f64,
    },
    #[error("Input tensor {input_index} requires grad but has no gradient after backward pass.")]
    MissingAnalyticalGrad { input_index: usize },
    #[error("Numerical gradient is NaN or infinite for input {input_index}, element {element_index}. Details: Loss+: {loss_plus:?}, Loss-: {loss_minus:?}")]
    NumericalGradNaNOrInfinite {
        input_index: usize,
        element_index: usize,
        loss_plus: f64,
        loss_minus: f64,
    },
    #[error("Function did not propagate requires_grad correctly.")]
    RequiresGradPropagationError,
    #[error("Tensor error during gradient check: {0}")]
    TensorError(#[from] TrebuchetError),
}

/// Settings of [`check_gradients`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradCheckConfig {
    /// Finite-difference step `h`.
    pub step: f64,
    /// Accepted relative difference between analytic and numerical gradients.
    pub max_relative: f64,
    /// Absolute floor for gradients close to zero.
    pub abs_tolerance: f64,
    /// Seed of the random output weights.
    pub seed: u64,
}

impl Default for GradCheckConfig {
    fn default() -> Self {
        GradCheckConfig {
            step: 1e-3,
            max_relative: 1e-3,
            abs_tolerance: 1e-3,
            seed: 0,
        }
    }
}

/// Checks analytical gradients against numerical gradients using central
/// finite differences.
///
/// `forward` receives a fresh graph and one leaf per entry of `inputs` (with
/// the `requires_grad` flag of that input) and returns the output node. The
/// output is reduced to the scalar `sum(w * out)` with fixed-seed random
/// weights `w`, so every output element contributes. Each element of every
/// input that requires gradients is then perturbed by `+-step` and the
/// difference quotient is compared with the analytic gradient.
pub fn check_gradients<F>(inputs: &[Tensor], forward: F, config: &GradCheckConfig) -> Result<(), GradCheckError>
where
    F: Fn(&mut Graph, &[NodeId]) -> Result<NodeId, TrebuchetError>,
{
    let mut graph = Graph::new();
    let leaves: Vec<NodeId> = inputs.iter().map(|t| graph.leaf(t.clone())).collect();
    let output = forward(&mut graph, &leaves)?;

    if !graph.requires_grad(output)? {
        return Err(GradCheckError::RequiresGradPropagationError);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let weights: Vec<f32> = (0..graph.tensor(output)?.numel())
        .map(|_| rng.gen_range(-1.0f32..1.0))
        .collect();

    graph.backward_with_grad(output, &weights)?;

    for (input_index, (input, &leaf)) in inputs.iter().zip(&leaves).enumerate() {
        if !input.requires_grad() {
            continue;
        }
        let analytical = graph
            .grad(leaf)?
            .ok_or(GradCheckError::MissingAnalyticalGrad { input_index })?;

        for element_index in 0..input.numel() {
            let original = input.data()[element_index];
            let plus = original + config.step as f32;
            let minus = original - config.step as f32;
            let loss_plus = weighted_output(inputs, input_index, element_index, plus, &forward, &weights)?;
            let loss_minus = weighted_output(inputs, input_index, element_index, minus, &forward, &weights)?;

            // Divide by the step actually taken after rounding to f32.
            let numerical_grad = (loss_plus - loss_minus) / (plus as f64 - minus as f64);
            if !numerical_grad.is_finite() {
                return Err(GradCheckError::NumericalGradNaNOrInfinite {
                    input_index,
                    element_index,
                    loss_plus,
                    loss_minus,
                });
            }

            let analytical_grad = analytical[element_index] as f64;
            if !relative_eq!(
                analytical_grad,
                numerical_grad,
                epsilon = config.abs_tolerance,
                max_relative = config.max_relative
            ) {
                return Err(GradCheckError::GradientMismatch {
                    input_index,
                    element_index,
                    analytical_grad,
                    numerical_grad,
                    difference: (analytical_grad - numerical_grad).abs(),
                });
            }
        }
    }
    Ok(())
}

/// `sum(w * out)` in f64 with one input element replaced by `value`.
fn weighted_output<F>(
    inputs: &[Tensor],
    input_index: usize,
    element_index: usize,
    value: f32,
    forward: &F,
    weights: &[f32],
) -> Result<f64, GradCheckError>
where
    F: Fn(&mut Graph, &[NodeId]) -> Result<NodeId, TrebuchetError>,
{
    let mut graph = Graph::new();
    let leaves: Vec<NodeId> = inputs
        .iter()
        .enumerate()
        .map(|(i, t)| {
            let mut t = t.clone();
            if i == input_index {
                t.data_mut()[element_index] = value;
            }
            graph.leaf(t)
        })
        .collect();
    let output = forward(&mut graph, &leaves)?;
    Ok(graph
        .data(output)?
        .iter()
        .zip(weights)
        .map(|(&o, &w)| o as f64 * w as f64)
        .sum())
}

#[cfg(test)]
#[path = "grad_check_test.rs"]
mod tests;
