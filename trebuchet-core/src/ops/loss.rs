//! Scalar loss operations.
//!
//! All losses take `(prediction, target)` of identical shape and produce a
//! rank-0 tensor. Targets are treated as constants: they never receive a
//! gradient, even when they require one.

use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::ops::activation::{last_dim, softmax_rows};
use crate::ops::{input_of, output_grad, OpCache, OpKind};

/// Lower clamp applied to probabilities before taking a logarithm.
pub const PROBABILITY_EPSILON: f32 = 1e-7;

fn check_same_shape(graph: &Graph, pred: NodeId, target: NodeId, kind: OpKind) -> Result<(), TrebuchetError> {
    let pred_shape = graph.shape(pred)?;
    let target_shape = graph.shape(target)?;
    if pred_shape != target_shape {
        return Err(TrebuchetError::shape_mismatch(pred_shape, target_shape, kind.name()));
    }
    Ok(())
}

/// Number of rows along the last axis; the batch size for row-wise losses.
fn row_count(shape: &[usize], operation: &str) -> Result<usize, TrebuchetError> {
    let numel: usize = shape.iter().product();
    Ok(numel / last_dim(shape, operation)?)
}

/// Reads the scalar upstream gradient and both operands of a loss node.
fn loss_inputs(graph: &Graph, id: NodeId) -> Result<(f32, &[f32], &[f32], usize), TrebuchetError> {
    let upstream = output_grad(graph, id)?.first().copied().unwrap_or(1.0);
    let pred = input_of(graph, id, 0)?;
    let target = input_of(graph, id, 1)?;
    Ok((
        upstream,
        graph.data(pred)?,
        graph.data(target)?,
        graph.tensor(pred)?.numel(),
    ))
}

fn push_scalar_loss(
    graph: &mut Graph,
    value: f32,
    kind: OpKind,
    pred: NodeId,
    target: NodeId,
    cache: OpCache,
) -> Result<NodeId, TrebuchetError> {
    log::trace!("{} loss = {}", kind, value);
    graph.push_op(vec![value], vec![], kind, vec![pred, target], cache)
}

/// Mean squared error over all elements.
pub fn mse_op(graph: &mut Graph, pred: NodeId, target: NodeId) -> Result<NodeId, TrebuchetError> {
    check_same_shape(graph, pred, target, OpKind::Mse)?;
    let p = graph.data(pred)?;
    let t = graph.data(target)?;
    let n = p.len().max(1) as f32;
    let loss = p.iter().zip(t).map(|(p, t)| (p - t) * (p - t)).sum::<f32>() / n;
    push_scalar_loss(graph, loss, OpKind::Mse, pred, target, OpCache::None)
}

pub(crate) fn mse_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let (upstream, p, t, numel) = loss_inputs(graph, id)?;
    let scale = 2.0 * upstream / numel.max(1) as f32;
    let grad = p.iter().zip(t).map(|(p, t)| scale * (p - t)).collect();
    Ok(vec![Some(grad), None])
}

/// Cross-entropy of probability rows against (one-hot) targets:
/// `-(1/B) * sum(t * ln(max(p, eps)))`, `B` being the number of rows.
pub fn cross_entropy_op(graph: &mut Graph, pred: NodeId, target: NodeId) -> Result<NodeId, TrebuchetError> {
    check_same_shape(graph, pred, target, OpKind::CrossEntropy)?;
    let rows = row_count(graph.shape(pred)?, "cross_entropy")?;
    let p = graph.data(pred)?;
    let t = graph.data(target)?;
    let total: f32 = p
        .iter()
        .zip(t)
        .map(|(&p, &t)| t * p.max(PROBABILITY_EPSILON).ln())
        .sum();
    let loss = -total / rows as f32;
    push_scalar_loss(graph, loss, OpKind::CrossEntropy, pred, target, OpCache::None)
}

pub(crate) fn cross_entropy_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let (upstream, p, t, _) = loss_inputs(graph, id)?;
    let rows = row_count(graph.shape(input_of(graph, id, 0)?)?, "cross_entropy backward")?;
    let scale = upstream / rows as f32;
    let grad = p
        .iter()
        .zip(t)
        .map(|(&p, &t)| -scale * t / p.max(PROBABILITY_EPSILON))
        .collect();
    Ok(vec![Some(grad), None])
}

/// Binary cross-entropy averaged over all elements, with predictions clamped
/// to `[eps, 1 - eps]`.
pub fn binary_cross_entropy_op(
    graph: &mut Graph,
    pred: NodeId,
    target: NodeId,
) -> Result<NodeId, TrebuchetError> {
    check_same_shape(graph, pred, target, OpKind::BinaryCrossEntropy)?;
    let p = graph.data(pred)?;
    let t = graph.data(target)?;
    let n = p.len().max(1) as f32;
    let total: f32 = p
        .iter()
        .zip(t)
        .map(|(&p, &t)| {
            let p = clamp_probability(p);
            t * p.ln() + (1.0 - t) * (1.0 - p).ln()
        })
        .sum();
    push_scalar_loss(
        graph,
        -total / n,
        OpKind::BinaryCrossEntropy,
        pred,
        target,
        OpCache::None,
    )
}

fn clamp_probability(p: f32) -> f32 {
    p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON)
}

pub(crate) fn binary_cross_entropy_backward(
    graph: &Graph,
    id: NodeId,
) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let (upstream, p, t, numel) = loss_inputs(graph, id)?;
    let scale = upstream / numel.max(1) as f32;
    let grad = p
        .iter()
        .zip(t)
        .map(|(&p, &t)| {
            let p = clamp_probability(p);
            scale * (p - t) / (p * (1.0 - p))
        })
        .collect();
    Ok(vec![Some(grad), None])
}

/// Softmax over the last axis of `logits` followed by cross-entropy, fused
/// so the backward pass is the well-conditioned `(softmax - t) / B`.
pub fn softmax_cross_entropy_op(
    graph: &mut Graph,
    logits: NodeId,
    target: NodeId,
) -> Result<NodeId, TrebuchetError> {
    check_same_shape(graph, logits, target, OpKind::SoftmaxCrossEntropy)?;
    let shape = graph.shape(logits)?;
    let row_len = last_dim(shape, "softmax_cross_entropy")?;
    let rows = row_count(shape, "softmax_cross_entropy")?;
    let probabilities = softmax_rows(graph.data(logits)?, row_len)?;
    let t = graph.data(target)?;
    let total: f32 = probabilities
        .iter()
        .zip(t)
        .map(|(&p, &t)| t * p.max(PROBABILITY_EPSILON).ln())
        .sum();
    push_scalar_loss(
        graph,
        -total / rows as f32,
        OpKind::SoftmaxCrossEntropy,
        logits,
        target,
        OpCache::Probabilities(probabilities),
    )
}

pub(crate) fn softmax_cross_entropy_backward(
    graph: &Graph,
    id: NodeId,
) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let (upstream, _, t, _) = loss_inputs(graph, id)?;
    let OpCache::Probabilities(probabilities) = &graph.node(id)?.cache else {
        return Err(TrebuchetError::MissingTensor(
            "softmax_cross_entropy probabilities".to_string(),
        ));
    };
    let rows = row_count(graph.shape(input_of(graph, id, 0)?)?, "softmax_cross_entropy backward")?;
    let scale = upstream / rows as f32;
    let grad = probabilities
        .iter()
        .zip(t)
        .map(|(&p, &t)| scale * (p - t))
        .collect();
    Ok(vec![Some(grad), None])
}

#[cfg(test)]
#[path = "loss_test.rs"]
mod tests;
