use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::ops::{input_of, output_grad, OpCache, OpKind};
use crate::tensor::utils::{alloc_filled, slice_leading};

/// Copies rows `[start, end)` along the leading axis into a new node.
///
/// The result is a contiguous copy, not a view. Its gradient is scattered
/// back into the matching rows of the input; the other rows get zeros.
///
/// # Errors
/// `SliceError` if `x` is a scalar or the range is out of bounds.
pub fn slice_op(graph: &mut Graph, x: NodeId, start: usize, end: usize) -> Result<NodeId, TrebuchetError> {
    let (data, shape) = slice_leading(graph.data(x)?, graph.shape(x)?, start, end)?;
    graph.push_op(data, shape, OpKind::Slice, vec![x], OpCache::RowOffset(start))
}

pub(crate) fn slice_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let input = graph.tensor(input_of(graph, id, 0)?)?;
    let &OpCache::RowOffset(start) = &graph.node(id)?.cache else {
        return Err(TrebuchetError::MissingTensor("slice offset".to_string()));
    };
    let row_len: usize = input.shape()[1..].iter().product();

    let mut grad_input = alloc_filled(input.numel(), 0.0)?;
    let offset = start * row_len;
    grad_input[offset..offset + grad.len()].copy_from_slice(grad);
    Ok(vec![Some(grad_input)])
}

#[cfg(test)]
#[path = "view_test.rs"]
mod tests;
