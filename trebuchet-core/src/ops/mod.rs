//! The differentiable operations.
//!
//! Every operation is a free `*_op` function that reads its inputs from a
//! [`Graph`], computes the output eagerly and records a node tagged with an
//! [`OpKind`]. The matching backward rule is selected by [`backward`] with a
//! `match` on that tag, so adding an operation means adding a variant, a
//! forward function and a backward function.

pub mod activation;
pub mod arithmetic;
pub mod linalg;
pub mod loss;
pub mod view;

pub use activation::{relu_op, sigmoid_op, softmax_op, tanh_op};
pub use arithmetic::{add_op, mul_op, sub_op};
pub use linalg::{matmul_op, transpose_op};
pub use loss::{binary_cross_entropy_op, cross_entropy_op, mse_op, softmax_cross_entropy_op};
pub use view::slice_op;

use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::tensor::utils::alloc_filled;

/// Tag identifying the operation that produced a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    Add,
    Sub,
    Mul,
    Matmul,
    Transpose,
    Relu,
    Sigmoid,
    Tanh,
    Softmax,
    Mse,
    CrossEntropy,
    BinaryCrossEntropy,
    SoftmaxCrossEntropy,
    Slice,
}

impl OpKind {
    pub const ALL: [OpKind; 14] = [
        OpKind::Add,
        OpKind::Sub,
        OpKind::Mul,
        OpKind::Matmul,
        OpKind::Transpose,
        OpKind::Relu,
        OpKind::Sigmoid,
        OpKind::Tanh,
        OpKind::Softmax,
        OpKind::Mse,
        OpKind::CrossEntropy,
        OpKind::BinaryCrossEntropy,
        OpKind::SoftmaxCrossEntropy,
        OpKind::Slice,
    ];

    /// Registry name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Add => "add",
            OpKind::Sub => "sub",
            OpKind::Mul => "mul",
            OpKind::Matmul => "matmul",
            OpKind::Transpose => "transpose",
            OpKind::Relu => "relu",
            OpKind::Sigmoid => "sigmoid",
            OpKind::Tanh => "tanh",
            OpKind::Softmax => "softmax",
            OpKind::Mse => "mse",
            OpKind::CrossEntropy => "cross_entropy",
            OpKind::BinaryCrossEntropy => "binary_cross_entropy",
            OpKind::SoftmaxCrossEntropy => "softmax_cross_entropy",
            OpKind::Slice => "slice",
        }
    }

    /// Number of graph inputs the operation consumes.
    pub fn arity(&self) -> usize {
        match self {
            OpKind::Add
            | OpKind::Sub
            | OpKind::Mul
            | OpKind::Matmul
            | OpKind::Mse
            | OpKind::CrossEntropy
            | OpKind::BinaryCrossEntropy
            | OpKind::SoftmaxCrossEntropy => 2,
            OpKind::Transpose
            | OpKind::Relu
            | OpKind::Sigmoid
            | OpKind::Tanh
            | OpKind::Softmax
            | OpKind::Slice => 1,
        }
    }
}

impl std::fmt::Display for OpKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Data an operation keeps on its output node for the backward pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OpCache {
    #[default]
    None,
    /// `input > 0` for every element (relu).
    Mask(Vec<bool>),
    /// Row-wise softmax of the logits (fused softmax + cross-entropy).
    Probabilities(Vec<f32>),
    /// First copied row (slice).
    RowOffset(usize),
}

/// Runs the forward of `kind` on `inputs`.
///
/// This is the name-driven entry point used by the registry. `slice` needs a
/// row range and is only reachable through [`slice_op`].
pub fn forward(kind: OpKind, graph: &mut Graph, inputs: &[NodeId]) -> Result<NodeId, TrebuchetError> {
    match (kind, inputs) {
        (OpKind::Add, &[a, b]) => add_op(graph, a, b),
        (OpKind::Sub, &[a, b]) => sub_op(graph, a, b),
        (OpKind::Mul, &[a, b]) => mul_op(graph, a, b),
        (OpKind::Matmul, &[a, b]) => matmul_op(graph, a, b),
        (OpKind::Transpose, &[a]) => transpose_op(graph, a),
        (OpKind::Relu, &[a]) => relu_op(graph, a),
        (OpKind::Sigmoid, &[a]) => sigmoid_op(graph, a),
        (OpKind::Tanh, &[a]) => tanh_op(graph, a),
        (OpKind::Softmax, &[a]) => softmax_op(graph, a),
        (OpKind::Mse, &[p, t]) => mse_op(graph, p, t),
        (OpKind::CrossEntropy, &[p, t]) => cross_entropy_op(graph, p, t),
        (OpKind::BinaryCrossEntropy, &[p, t]) => binary_cross_entropy_op(graph, p, t),
        (OpKind::SoftmaxCrossEntropy, &[l, t]) => softmax_cross_entropy_op(graph, l, t),
        (OpKind::Slice, _) => Err(TrebuchetError::InvalidConfiguration(
            "slice needs a row range, call slice_op directly".to_string(),
        )),
        (kind, inputs) => Err(TrebuchetError::InvalidConfiguration(format!(
            "{} expects {} inputs, got {}",
            kind,
            kind.arity(),
            inputs.len()
        ))),
    }
}

/// Runs the backward rule of node `id`.
///
/// Returns one entry per input of the node, `None` where the input receives
/// no gradient. Leaves have no inputs and yield an empty vector.
pub(crate) fn backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let kind = match graph.node(id)?.op() {
        Some(kind) => kind,
        None => return Ok(Vec::new()),
    };
    match kind {
        OpKind::Add => arithmetic::add_backward(graph, id),
        OpKind::Sub => arithmetic::sub_backward(graph, id),
        OpKind::Mul => arithmetic::mul_backward(graph, id),
        OpKind::Matmul => linalg::matmul_backward(graph, id),
        OpKind::Transpose => linalg::transpose_backward(graph, id),
        OpKind::Relu => activation::relu_backward(graph, id),
        OpKind::Sigmoid => activation::sigmoid_backward(graph, id),
        OpKind::Tanh => activation::tanh_backward(graph, id),
        OpKind::Softmax => activation::softmax_backward(graph, id),
        OpKind::Mse => loss::mse_backward(graph, id),
        OpKind::CrossEntropy => loss::cross_entropy_backward(graph, id),
        OpKind::BinaryCrossEntropy => loss::binary_cross_entropy_backward(graph, id),
        OpKind::SoftmaxCrossEntropy => loss::softmax_cross_entropy_backward(graph, id),
        OpKind::Slice => view::slice_backward(graph, id),
    }
}

/// Gradient flowing into node `id`, set by the engine before its backward runs.
pub(crate) fn output_grad(graph: &Graph, id: NodeId) -> Result<&[f32], TrebuchetError> {
    graph
        .tensor(id)?
        .grad()
        .ok_or_else(|| TrebuchetError::MissingTensor(format!("gradient of node {}", id.index())))
}

/// Input node `position` of node `id`.
pub(crate) fn input_of(graph: &Graph, id: NodeId, position: usize) -> Result<NodeId, TrebuchetError> {
    let node = graph.node(id)?;
    node.inputs().get(position).copied().ok_or_else(|| {
        TrebuchetError::InvalidConfiguration(format!(
            "node {} has no input {}",
            id.index(),
            position
        ))
    })
}

/// Shared forward of the element-wise unary operations.
pub(crate) fn apply_unary_op<F>(
    graph: &mut Graph,
    a: NodeId,
    kind: OpKind,
    cache: OpCache,
    op: F,
) -> Result<NodeId, TrebuchetError>
where
    F: Fn(f32) -> f32,
{
    let input = graph.tensor(a)?;
    let shape = input.shape().to_vec();
    let mut output = alloc_filled(input.numel(), 0.0)?;
    for (out, &x) in output.iter_mut().zip(input.data()) {
        *out = op(x);
    }
    graph.push_op(output, shape, kind, vec![a], cache)
}
