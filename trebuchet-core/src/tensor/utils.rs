use crate::error::TrebuchetError;

/// Calculates the strides for a given shape.
/// Strides represent the number of elements to skip in the flattened data array
/// to move one step along each dimension.
///
/// Example:
/// shape = [2, 3] -> strides = [3, 1]
/// shape = [2, 2, 2] -> strides = [4, 2, 1]
pub fn calculate_strides(shape: &[usize]) -> Vec<usize> {
    if shape.is_empty() {
        return vec![];
    }
    let rank = shape.len();
    let mut strides = vec![1; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Allocates a buffer of `numel` elements set to `value`.
///
/// Uses fallible reservation so an allocation failure becomes
/// `TrebuchetError::AllocationFailure` instead of aborting.
pub fn alloc_filled(numel: usize, value: f32) -> Result<Vec<f32>, TrebuchetError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(numel)
        .map_err(|_| TrebuchetError::AllocationFailure { numel })?;
    buffer.resize(numel, value);
    Ok(buffer)
}

/// Result of matching two shapes under the trailing-suffix broadcast rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    /// Shape of the result (the larger operand's shape).
    pub output_shape: Vec<usize>,
    /// Element count of operand `a`. Output element `i` reads `a[i % inner_a]`.
    pub inner_a: usize,
    /// Element count of operand `b`. Output element `i` reads `b[i % inner_b]`.
    pub inner_b: usize,
}

/// Determines the output shape of an elementwise binary op.
///
/// The shapes must be equal, or one of them must be a trailing suffix of the
/// other (e.g. a bias `[n]` against a batch `[m, n]`). Anything else is a
/// `ShapeMismatch` for `operation`.
pub fn broadcast_suffix(
    shape_a: &[usize],
    shape_b: &[usize],
    operation: &str,
) -> Result<Broadcast, TrebuchetError> {
    let numel_a: usize = shape_a.iter().product();
    let numel_b: usize = shape_b.iter().product();
    if shape_a == shape_b {
        return Ok(Broadcast {
            output_shape: shape_a.to_vec(),
            inner_a: numel_a,
            inner_b: numel_b,
        });
    }
    if shape_a.len() > shape_b.len() && shape_a.ends_with(shape_b) {
        return Ok(Broadcast {
            output_shape: shape_a.to_vec(),
            inner_a: numel_a,
            inner_b: numel_b,
        });
    }
    if shape_b.len() > shape_a.len() && shape_b.ends_with(shape_a) {
        return Ok(Broadcast {
            output_shape: shape_b.to_vec(),
            inner_a: numel_a,
            inner_b: numel_b,
        });
    }
    Err(TrebuchetError::shape_mismatch(shape_a, shape_b, operation))
}

/// Sums a gradient of `output_len` elements down to an operand of `inner`
/// elements that was broadcast along the leading axes.
pub fn reduce_to_inner(grad: &[f32], inner: usize) -> Vec<f32> {
    if inner == grad.len() {
        return grad.to_vec();
    }
    let mut reduced = vec![0.0; inner];
    if inner == 0 {
        return reduced;
    }
    for chunk in grad.chunks(inner) {
        reduced.iter_mut().zip(chunk).for_each(|(r, &g)| *r += g);
    }
    reduced
}

/// Copies rows `[start, end)` of the leading axis of a row-major buffer.
pub fn slice_leading(
    data: &[f32],
    shape: &[usize],
    start: usize,
    end: usize,
) -> Result<(Vec<f32>, Vec<usize>), TrebuchetError> {
    let Some(&rows) = shape.first() else {
        return Err(TrebuchetError::SliceError {
            message: "cannot slice a scalar tensor".to_string(),
        });
    };
    if start > end || end > rows {
        return Err(TrebuchetError::SliceError {
            message: format!("range {}..{} is invalid for leading dimension {}", start, end, rows),
        });
    }
    let row_len: usize = shape[1..].iter().product();
    let mut out_shape = shape.to_vec();
    out_shape[0] = end - start;
    Ok((data[start * row_len..end * row_len].to_vec(), out_shape))
}

#[cfg(test)]
#[path = "utils_test.rs"]
mod tests;
