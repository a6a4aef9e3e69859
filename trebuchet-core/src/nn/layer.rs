use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::nn::Parameter;
use crate::ops;
use crate::registry::Registry;
use crate::tensor::{randn, zeros, Tensor};

/// Seed of the weight initialisation when none is given.
pub const DEFAULT_INIT_SEED: u64 = 42;

/// Registry tag of a layer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Linear,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
    Mse,
    CrossEntropy,
    BinaryCrossEntropy,
}

impl LayerKind {
    pub const ALL: [LayerKind; 8] = [
        LayerKind::Linear,
        LayerKind::Relu,
        LayerKind::Sigmoid,
        LayerKind::Tanh,
        LayerKind::Softmax,
        LayerKind::Mse,
        LayerKind::CrossEntropy,
        LayerKind::BinaryCrossEntropy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LayerKind::Linear => "linear",
            LayerKind::Relu => "relu",
            LayerKind::Sigmoid => "sigmoid",
            LayerKind::Tanh => "tanh",
            LayerKind::Softmax => "softmax",
            LayerKind::Mse => "mse",
            LayerKind::CrossEntropy => "cross_entropy",
            LayerKind::BinaryCrossEntropy => "binary_cross_entropy",
        }
    }
}

/// Variant-specific layer settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LayerParams {
    #[default]
    None,
    Linear {
        in_features: usize,
        out_features: usize,
        seed: u64,
    },
}

/// Name of a registered layer type plus its settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    pub name: String,
    pub params: LayerParams,
}

impl LayerConfig {
    pub fn new(name: impl Into<String>, params: LayerParams) -> Self {
        LayerConfig {
            name: name.into(),
            params,
        }
    }

    /// Fully connected layer `[in] -> [out]` initialised with the default seed.
    pub fn linear(in_features: usize, out_features: usize) -> Self {
        Self::linear_seeded(in_features, out_features, DEFAULT_INIT_SEED)
    }

    pub fn linear_seeded(in_features: usize, out_features: usize, seed: u64) -> Self {
        Self::new(
            "linear",
            LayerParams::Linear {
                in_features,
                out_features,
                seed,
            },
        )
    }

    pub fn relu() -> Self {
        Self::new("relu", LayerParams::None)
    }

    pub fn sigmoid() -> Self {
        Self::new("sigmoid", LayerParams::None)
    }

    pub fn tanh() -> Self {
        Self::new("tanh", LayerParams::None)
    }

    pub fn softmax() -> Self {
        Self::new("softmax", LayerParams::None)
    }

    pub fn mse_loss() -> Self {
        Self::new("mse", LayerParams::None)
    }

    pub fn cross_entropy_loss() -> Self {
        Self::new("cross_entropy", LayerParams::None)
    }

    pub fn bce_loss() -> Self {
        Self::new("binary_cross_entropy", LayerParams::None)
    }
}

/// Applies a linear transformation to the incoming data: `y = x W + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    /// Shape `[in_features, out_features]`.
    weight: Parameter,
    /// Shape `[out_features]`.
    bias: Parameter,
    in_features: usize,
    out_features: usize,
}

impl Linear {
    /// He-initialised weights (`randn * sqrt(2 / in)`) and a zero bias.
    pub fn new(in_features: usize, out_features: usize, seed: u64) -> Result<Self, TrebuchetError> {
        if in_features == 0 || out_features == 0 {
            return Err(TrebuchetError::InvalidConfiguration(format!(
                "linear layer needs non-zero features, got {} -> {}",
                in_features, out_features
            )));
        }
        let mut weight = randn(&[in_features, out_features], seed)?;
        let scale = (2.0 / in_features as f32).sqrt();
        weight.data_mut().iter_mut().for_each(|w| *w *= scale);
        let bias = zeros(&[out_features])?;
        Ok(Linear {
            weight: Parameter::named(weight, "weight"),
            bias: Parameter::named(bias, "bias"),
            in_features,
            out_features,
        })
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }

    pub fn bias(&self) -> &Parameter {
        &self.bias
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn forward(&self, graph: &mut Graph, input: NodeId) -> Result<NodeId, TrebuchetError> {
        let weight = graph.param(&self.weight);
        let bias = graph.param(&self.bias);
        let product = ops::matmul_op(graph, input, weight)?;
        ops::add_op(graph, product, bias)
    }
}

/// Parameter-free element-wise (or row-wise) non-linearity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
}

impl Activation {
    pub fn forward(&self, graph: &mut Graph, input: NodeId) -> Result<NodeId, TrebuchetError> {
        match self {
            Activation::Relu => ops::relu_op(graph, input),
            Activation::Sigmoid => ops::sigmoid_op(graph, input),
            Activation::Tanh => ops::tanh_op(graph, input),
            Activation::Softmax => ops::softmax_op(graph, input),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    Mse,
    CrossEntropy,
    BinaryCrossEntropy,
}

impl LossKind {
    /// Resolves a loss by its registry name.
    pub fn from_name(name: &str) -> Result<Self, TrebuchetError> {
        match name {
            "mse" => Ok(LossKind::Mse),
            "cross_entropy" => Ok(LossKind::CrossEntropy),
            "binary_cross_entropy" => Ok(LossKind::BinaryCrossEntropy),
            other => Err(TrebuchetError::UnknownOperation(other.to_string())),
        }
    }

    /// Applies the loss to `pred` against `target`.
    pub fn apply(&self, graph: &mut Graph, pred: NodeId, target: NodeId) -> Result<NodeId, TrebuchetError> {
        match self {
            LossKind::Mse => ops::mse_op(graph, pred, target),
            LossKind::CrossEntropy => ops::cross_entropy_op(graph, pred, target),
            LossKind::BinaryCrossEntropy => ops::binary_cross_entropy_op(graph, pred, target),
        }
    }
}

/// A loss used as the last layer of a network; compares its input with a
/// target set beforehand.
#[derive(Debug, Clone)]
pub struct LossLayer {
    kind: LossKind,
    target: Option<Tensor>,
}

impl LossLayer {
    pub fn kind(&self) -> LossKind {
        self.kind
    }

    pub fn target(&self) -> Option<&Tensor> {
        self.target.as_ref()
    }

    pub fn forward(&self, graph: &mut Graph, input: NodeId) -> Result<NodeId, TrebuchetError> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| TrebuchetError::MissingTensor("loss layer target".to_string()))?;
        let target = graph.leaf(target.detach());
        self.kind.apply(graph, input, target)
    }
}

/// A network layer.
#[derive(Debug, Clone)]
pub enum Layer {
    Linear(Linear),
    Activation(Activation),
    Loss(LossLayer),
}

impl Layer {
    /// Builds the layer named by `config.name`.
    ///
    /// # Errors
    /// * `UnknownLayer` if the name is not registered.
    /// * `InvalidConfiguration` if a linear layer has no (or zero) sizes.
    pub fn create(registry: &Registry, config: &LayerConfig) -> Result<Layer, TrebuchetError> {
        let kind = registry.layer(&config.name)?;
        let layer = match kind {
            LayerKind::Linear => match config.params {
                LayerParams::Linear {
                    in_features,
                    out_features,
                    seed,
                } => Layer::Linear(Linear::new(in_features, out_features, seed)?),
                LayerParams::None => {
                    return Err(TrebuchetError::InvalidConfiguration(
                        "linear layer requires in/out features".to_string(),
                    ))
                }
            },
            LayerKind::Relu => Layer::Activation(Activation::Relu),
            LayerKind::Sigmoid => Layer::Activation(Activation::Sigmoid),
            LayerKind::Tanh => Layer::Activation(Activation::Tanh),
            LayerKind::Softmax => Layer::Activation(Activation::Softmax),
            LayerKind::Mse => Layer::loss(LossKind::Mse),
            LayerKind::CrossEntropy => Layer::loss(LossKind::CrossEntropy),
            LayerKind::BinaryCrossEntropy => Layer::loss(LossKind::BinaryCrossEntropy),
        };
        log::debug!("created layer {} ({} parameters)", config.name, layer.parameters().len());
        Ok(layer)
    }

    fn loss(kind: LossKind) -> Layer {
        Layer::Loss(LossLayer { kind, target: None })
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            Layer::Linear(_) => LayerKind::Linear,
            Layer::Activation(Activation::Relu) => LayerKind::Relu,
            Layer::Activation(Activation::Sigmoid) => LayerKind::Sigmoid,
            Layer::Activation(Activation::Tanh) => LayerKind::Tanh,
            Layer::Activation(Activation::Softmax) => LayerKind::Softmax,
            Layer::Loss(loss) => match loss.kind {
                LossKind::Mse => LayerKind::Mse,
                LossKind::CrossEntropy => LayerKind::CrossEntropy,
                LossKind::BinaryCrossEntropy => LayerKind::BinaryCrossEntropy,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn forward(&self, graph: &mut Graph, input: NodeId) -> Result<NodeId, TrebuchetError> {
        match self {
            Layer::Linear(linear) => linear.forward(graph, input),
            Layer::Activation(activation) => activation.forward(graph, input),
            Layer::Loss(loss) => loss.forward(graph, input),
        }
    }

    /// Handles to the learnable tensors, weight before bias.
    pub fn parameters(&self) -> Vec<Parameter> {
        match self {
            Layer::Linear(linear) => vec![linear.weight.clone(), linear.bias.clone()],
            Layer::Activation(_) | Layer::Loss(_) => Vec::new(),
        }
    }

    pub fn zero_grad(&self) {
        for param in self.parameters() {
            param.zero_grad();
        }
    }

    /// Sets the target compared by a loss layer.
    pub fn set_target(&mut self, target: Tensor) -> Result<(), TrebuchetError> {
        match self {
            Layer::Loss(loss) => {
                loss.target = Some(target);
                Ok(())
            }
            other => Err(TrebuchetError::InvalidConfiguration(format!(
                "{} layer has no target",
                other.name()
            ))),
        }
    }
}

#[cfg(test)]
#[path = "layer_test.rs"]
mod tests;
