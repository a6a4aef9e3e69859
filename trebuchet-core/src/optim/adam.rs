use crate::error::TrebuchetError;
use crate::nn::Parameter;
use crate::tensor::utils::alloc_filled;

/// State of the Adam optimizer: step counter and both moment estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct AdamState {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    t: u64,
    /// First moment (moving average of gradients), one buffer per parameter.
    m: Vec<Vec<f32>>,
    /// Second moment (moving average of squared gradients).
    v: Vec<Vec<f32>>,
}

impl AdamState {
    pub fn new(
        parameters: &[Parameter],
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    ) -> Result<Self, TrebuchetError> {
        if learning_rate <= 0.0 {
            return Err(TrebuchetError::InvalidConfiguration(
                "Learning rate must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&beta1) {
            return Err(TrebuchetError::InvalidConfiguration(
                "Beta1 must be in [0, 1)".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&beta2) {
            return Err(TrebuchetError::InvalidConfiguration(
                "Beta2 must be in [0, 1)".to_string(),
            ));
        }
        if epsilon <= 0.0 {
            return Err(TrebuchetError::InvalidConfiguration(
                "Epsilon must be positive".to_string(),
            ));
        }
        let zeros = || {
            parameters
                .iter()
                .map(|p| alloc_filled(p.numel(), 0.0))
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(AdamState {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            t: 0,
            m: zeros()?,
            v: zeros()?,
        })
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Number of steps taken so far.
    pub fn t(&self) -> u64 {
        self.t
    }

    pub fn m(&self) -> &[Vec<f32>] {
        &self.m
    }

    pub fn v(&self) -> &[Vec<f32>] {
        &self.v
    }

    pub(crate) fn step(&mut self, parameters: &[Parameter]) -> usize {
        self.t += 1;
        // beta^t is already 0 in f32 long before the exponent saturates.
        let exponent = i32::try_from(self.t).unwrap_or(i32::MAX);
        let bias_correction1 = 1.0 - self.beta1.powi(exponent);
        let bias_correction2 = 1.0 - self.beta2.powi(exponent);

        let mut updated = 0;
        for (i, param) in parameters.iter().enumerate() {
            let mut tensor = param.write();
            let Some(grad) = tensor.grad.take() else {
                continue;
            };
            let (m, v) = (&mut self.m[i], &mut self.v[i]);
            for (j, (p, &g)) in tensor.data.iter_mut().zip(&grad).enumerate() {
                m[j] = self.beta1 * m[j] + (1.0 - self.beta1) * g;
                v[j] = self.beta2 * v[j] + (1.0 - self.beta2) * g * g;
                let m_hat = m[j] / bias_correction1;
                let v_hat = v[j] / bias_correction2;
                *p -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
            }
            tensor.grad = Some(grad);
            updated += 1;
        }
        updated
    }
}

#[cfg(test)]
#[path = "adam_test.rs"]
mod tests;
