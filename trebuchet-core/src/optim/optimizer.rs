use crate::error::TrebuchetError;
use crate::nn::Parameter;
use crate::optim::{AdamState, SgdState};
use crate::registry::Registry;

/// Registry tag of an optimization algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptimizerKind {
    Sgd,
    Adam,
}

impl OptimizerKind {
    pub const ALL: [OptimizerKind; 2] = [OptimizerKind::Sgd, OptimizerKind::Adam];

    pub fn name(&self) -> &'static str {
        match self {
            OptimizerKind::Sgd => "sgd",
            OptimizerKind::Adam => "adam",
        }
    }
}

/// Hyperparameters of an optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptimizerParams {
    Sgd {
        learning_rate: f32,
        momentum: f32,
    },
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
}

/// Name of a registered optimizer plus its hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub name: String,
    pub params: OptimizerParams,
}

impl OptimizerConfig {
    pub fn sgd(learning_rate: f32, momentum: f32) -> Self {
        OptimizerConfig {
            name: "sgd".to_string(),
            params: OptimizerParams::Sgd {
                learning_rate,
                momentum,
            },
        }
    }

    pub fn adam(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        OptimizerConfig {
            name: "adam".to_string(),
            params: OptimizerParams::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            },
        }
    }

    /// Adam with `lr = 0.001`, `betas = (0.9, 0.999)`, `eps = 1e-8`.
    pub fn adam_default() -> Self {
        Self::adam(0.001, 0.9, 0.999, 1e-8)
    }
}

/// Per-algorithm state, sized like the parameter list.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizerState {
    Sgd(SgdState),
    Adam(AdamState),
}

/// Updates a fixed list of parameters from their accumulated gradients.
#[derive(Debug)]
pub struct Optimizer {
    kind: OptimizerKind,
    parameters: Vec<Parameter>,
    state: OptimizerState,
    steps: u64,
}

impl Optimizer {
    /// Builds the optimizer named by `config.name` over `parameters`.
    ///
    /// # Errors
    /// * `EmptyParameterList` if `parameters` is empty.
    /// * `UnknownOptimizer` if the name is not registered.
    /// * `InvalidConfiguration` for out-of-range hyperparameters, or
    ///   hyperparameters of another algorithm.
    pub fn create(
        registry: &Registry,
        parameters: Vec<Parameter>,
        config: &OptimizerConfig,
    ) -> Result<Self, TrebuchetError> {
        if parameters.is_empty() {
            return Err(TrebuchetError::EmptyParameterList);
        }
        let kind = registry.optimizer(&config.name)?;
        let state = match (kind, config.params) {
            (
                OptimizerKind::Sgd,
                OptimizerParams::Sgd {
                    learning_rate,
                    momentum,
                },
            ) => OptimizerState::Sgd(SgdState::new(&parameters, learning_rate, momentum)?),
            (
                OptimizerKind::Adam,
                OptimizerParams::Adam {
                    learning_rate,
                    beta1,
                    beta2,
                    epsilon,
                },
            ) => OptimizerState::Adam(AdamState::new(
                &parameters,
                learning_rate,
                beta1,
                beta2,
                epsilon,
            )?),
            (kind, params) => {
                return Err(TrebuchetError::InvalidConfiguration(format!(
                    "{} optimizer cannot use {:?}",
                    kind.name(),
                    params
                )))
            }
        };
        log::debug!(
            "created {} optimizer over {} parameters",
            kind.name(),
            parameters.len()
        );
        Ok(Optimizer {
            kind,
            parameters,
            state,
            steps: 0,
        })
    }

    /// Performs a single optimization step.
    ///
    /// Parameters without a gradient are left untouched.
    pub fn step(&mut self) -> Result<(), TrebuchetError> {
        let updated = match &mut self.state {
            OptimizerState::Sgd(state) => state.step(&self.parameters),
            OptimizerState::Adam(state) => state.step(&self.parameters),
        };
        self.steps += 1;
        if updated == 0 {
            log::warn!(
                "{} step {}: no parameter has a gradient",
                self.kind.name(),
                self.steps
            );
        }
        Ok(())
    }

    /// Resets the gradient of every parameter to zero.
    pub fn zero_grad(&mut self) {
        for param in &self.parameters {
            param.zero_grad();
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn state(&self) -> &OptimizerState {
        &self.state
    }

    /// Number of `step` calls so far.
    pub fn step_count(&self) -> u64 {
        self.steps
    }
}

#[cfg(test)]
#[path = "optimizer_test.rs"]
mod tests;
