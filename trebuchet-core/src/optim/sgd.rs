use crate::error::TrebuchetError;
use crate::nn::Parameter;
use crate::tensor::utils::alloc_filled;

/// State of stochastic gradient descent with optional (classical) momentum.
#[derive(Debug, Clone, PartialEq)]
pub struct SgdState {
    learning_rate: f32,
    momentum: f32,
    /// One velocity buffer per parameter; empty when `momentum == 0`.
    velocity: Vec<Vec<f32>>,
}

impl SgdState {
    /// Creates the state for `parameters`.
    ///
    /// # Errors
    /// `InvalidConfiguration` if the learning rate is not positive or the
    /// momentum is negative.
    pub fn new(parameters: &[Parameter], learning_rate: f32, momentum: f32) -> Result<Self, TrebuchetError> {
        if learning_rate <= 0.0 {
            return Err(TrebuchetError::InvalidConfiguration(
                "Learning rate must be positive".to_string(),
            ));
        }
        if momentum < 0.0 {
            return Err(TrebuchetError::InvalidConfiguration(
                "Momentum must be non-negative".to_string(),
            ));
        }
        let velocity = if momentum > 0.0 {
            parameters
                .iter()
                .map(|p| alloc_filled(p.numel(), 0.0))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            Vec::new()
        };
        Ok(SgdState {
            learning_rate,
            momentum,
            velocity,
        })
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    pub fn velocity(&self) -> &[Vec<f32>] {
        &self.velocity
    }

    /// Updates every parameter that has a gradient; returns how many did.
    pub(crate) fn step(&mut self, parameters: &[Parameter]) -> usize {
        let mut updated = 0;
        for (i, param) in parameters.iter().enumerate() {
            let mut tensor = param.write();
            let Some(grad) = tensor.grad.take() else {
                continue;
            };
            if self.momentum > 0.0 {
                let velocity = &mut self.velocity[i];
                for ((p, v), g) in tensor.data.iter_mut().zip(velocity.iter_mut()).zip(&grad) {
                    *v = self.momentum * *v - self.learning_rate * g;
                    *p += *v;
                }
            } else {
                for (p, g) in tensor.data.iter_mut().zip(&grad) {
                    *p -= self.learning_rate * g;
                }
            }
            tensor.grad = Some(grad);
            updated += 1;
        }
        updated
    }
}

#[cfg(test)]
#[path = "sgd_test.rs"]
mod tests;
