use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::ops::{input_of, output_grad, OpCache, OpKind};
use crate::tensor::utils::{alloc_filled, broadcast_suffix, reduce_to_inner, Broadcast};

/// Element-wise `a + b`, with the smaller operand broadcast along leading axes.
pub fn add_op(graph: &mut Graph, a: NodeId, b: NodeId) -> Result<NodeId, TrebuchetError> {
    binary_elementwise(graph, a, b, OpKind::Add, |x, y| x + y)
}

/// Element-wise `a - b`.
pub fn sub_op(graph: &mut Graph, a: NodeId, b: NodeId) -> Result<NodeId, TrebuchetError> {
    binary_elementwise(graph, a, b, OpKind::Sub, |x, y| x - y)
}

/// Element-wise (Hadamard) product.
pub fn mul_op(graph: &mut Graph, a: NodeId, b: NodeId) -> Result<NodeId, TrebuchetError> {
    binary_elementwise(graph, a, b, OpKind::Mul, |x, y| x * y)
}

fn binary_elementwise<F>(
    graph: &mut Graph,
    a: NodeId,
    b: NodeId,
    kind: OpKind,
    op: F,
) -> Result<NodeId, TrebuchetError>
where
    F: Fn(f32, f32) -> f32,
{
    let data_a = graph.data(a)?;
    let data_b = graph.data(b)?;
    let Broadcast {
        output_shape,
        inner_a,
        inner_b,
    } = broadcast_suffix(graph.shape(a)?, graph.shape(b)?, kind.name())?;

    let numel: usize = output_shape.iter().product();
    let mut output = alloc_filled(numel, 0.0)?;
    for (i, out) in output.iter_mut().enumerate() {
        *out = op(data_a[i % inner_a], data_b[i % inner_b]);
    }
    graph.push_op(output, output_shape, kind, vec![a, b], OpCache::None)
}

fn operand_sizes(graph: &Graph, id: NodeId) -> Result<(NodeId, NodeId, usize, usize), TrebuchetError> {
    let a = input_of(graph, id, 0)?;
    let b = input_of(graph, id, 1)?;
    Ok((a, b, graph.tensor(a)?.numel(), graph.tensor(b)?.numel()))
}

pub(crate) fn add_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let (_, _, inner_a, inner_b) = operand_sizes(graph, id)?;
    Ok(vec![
        Some(reduce_to_inner(grad, inner_a)),
        Some(reduce_to_inner(grad, inner_b)),
    ])
}

pub(crate) fn sub_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let (_, _, inner_a, inner_b) = operand_sizes(graph, id)?;
    let mut grad_b = reduce_to_inner(grad, inner_b);
    grad_b.iter_mut().for_each(|g| *g = -*g);
    Ok(vec![Some(reduce_to_inner(grad, inner_a)), Some(grad_b)])
}

pub(crate) fn mul_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let (a, b, inner_a, inner_b) = operand_sizes(graph, id)?;
    let data_a = graph.data(a)?;
    let data_b = graph.data(b)?;

    // d(a*b)/da = b, d(a*b)/db = a, summed over broadcast positions.
    let mut grad_a = alloc_filled(inner_a, 0.0)?;
    let mut grad_b = alloc_filled(inner_b, 0.0)?;
    for (i, &g) in grad.iter().enumerate() {
        grad_a[i % inner_a] += g * data_b[i % inner_b];
        grad_b[i % inner_b] += g * data_a[i % inner_a];
    }
    Ok(vec![Some(grad_a), Some(grad_b)])
}

#[cfg(test)]
#[path = "arithmetic_test.rs"]
mod tests;
