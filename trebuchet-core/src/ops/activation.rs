use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::ops::{apply_unary_op, input_of, output_grad, OpCache, OpKind};
use crate::tensor::utils::alloc_filled;

/// Rectified linear unit, `max(0, x)` element-wise.
pub fn relu_op(graph: &mut Graph, a: NodeId) -> Result<NodeId, TrebuchetError> {
    let mask: Vec<bool> = graph.data(a)?.iter().map(|&x| x > 0.0).collect();
    apply_unary_op(graph, a, OpKind::Relu, OpCache::Mask(mask), |x| x.max(0.0))
}

pub(crate) fn relu_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let OpCache::Mask(mask) = &graph.node(id)?.cache else {
        return Err(TrebuchetError::MissingTensor("relu mask".to_string()));
    };
    let grad_input = grad
        .iter()
        .zip(mask)
        .map(|(&g, &positive)| if positive { g } else { 0.0 })
        .collect();
    Ok(vec![Some(grad_input)])
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Logistic sigmoid `1 / (1 + e^-x)` element-wise.
pub fn sigmoid_op(graph: &mut Graph, a: NodeId) -> Result<NodeId, TrebuchetError> {
    apply_unary_op(graph, a, OpKind::Sigmoid, OpCache::None, sigmoid)
}

pub(crate) fn sigmoid_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let output = graph.data(id)?;
    let grad_input = grad
        .iter()
        .zip(output)
        .map(|(&g, &y)| g * y * (1.0 - y))
        .collect();
    Ok(vec![Some(grad_input)])
}

/// Hyperbolic tangent element-wise.
pub fn tanh_op(graph: &mut Graph, a: NodeId) -> Result<NodeId, TrebuchetError> {
    apply_unary_op(graph, a, OpKind::Tanh, OpCache::None, f32::tanh)
}

pub(crate) fn tanh_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let output = graph.data(id)?;
    let grad_input = grad
        .iter()
        .zip(output)
        .map(|(&g, &y)| g * (1.0 - y * y))
        .collect();
    Ok(vec![Some(grad_input)])
}

/// Length of the last axis, i.e. the size of one softmax row.
pub(crate) fn last_dim(shape: &[usize], operation: &str) -> Result<usize, TrebuchetError> {
    match shape.last() {
        Some(&dim) if dim > 0 => Ok(dim),
        _ => Err(TrebuchetError::ShapeMismatch {
            expected: vec![1],
            actual: shape.to_vec(),
            operation: format!("{} (needs a non-empty last axis)", operation),
        }),
    }
}

/// Numerically stable softmax over rows of length `row_len`.
pub(crate) fn softmax_rows(data: &[f32], row_len: usize) -> Result<Vec<f32>, TrebuchetError> {
    let mut out = alloc_filled(data.len(), 0.0)?;
    for (row, out_row) in data.chunks(row_len).zip(out.chunks_mut(row_len)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for (o, &x) in out_row.iter_mut().zip(row) {
            *o = (x - max).exp();
            sum += *o;
        }
        out_row.iter_mut().for_each(|o| *o /= sum);
    }
    Ok(out)
}

/// Softmax along the last axis. Every row of the output sums to 1.
pub fn softmax_op(graph: &mut Graph, a: NodeId) -> Result<NodeId, TrebuchetError> {
    let shape = graph.shape(a)?.to_vec();
    let row_len = last_dim(&shape, "softmax")?;
    let output = softmax_rows(graph.data(a)?, row_len)?;
    graph.push_op(output, shape, OpKind::Softmax, vec![a], OpCache::None)
}

pub(crate) fn softmax_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let output = graph.data(id)?;
    let row_len = last_dim(graph.shape(input_of(graph, id, 0)?)?, "softmax backward")?;

    // dx = y * (g - <g, y>) per row
    let mut grad_input = alloc_filled(output.len(), 0.0)?;
    for ((g_row, y_row), dx_row) in grad
        .chunks(row_len)
        .zip(output.chunks(row_len))
        .zip(grad_input.chunks_mut(row_len))
    {
        let dot: f32 = g_row.iter().zip(y_row).map(|(g, y)| g * y).sum();
        for ((dx, &g), &y) in dx_row.iter_mut().zip(g_row).zip(y_row) {
            *dx = y * (g - dot);
        }
    }
    Ok(vec![Some(grad_input)])
}

#[cfg(test)]
#[path = "activation_test.rs"]
mod tests;
