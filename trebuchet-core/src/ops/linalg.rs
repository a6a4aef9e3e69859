use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::ops::{input_of, output_grad, OpCache, OpKind};
use crate::tensor::utils::alloc_filled;

/// Reads `[rows, cols]` from a rank-2 shape.
fn matrix_dims(shape: &[usize], operation: &str) -> Result<(usize, usize), TrebuchetError> {
    match *shape {
        [rows, cols] => Ok((rows, cols)),
        _ => Err(TrebuchetError::ShapeMismatch {
            expected: vec![0, 0],
            actual: shape.to_vec(),
            operation: format!("{} (expected a 2-D tensor)", operation),
        }),
    }
}

/// Row-major `[m, k] x [k, n]` product.
pub(crate) fn matmul_kernel(
    a: &[f32],
    b: &[f32],
    m: usize,
    k: usize,
    n: usize,
) -> Result<Vec<f32>, TrebuchetError> {
    let mut out = alloc_filled(m * n, 0.0)?;
    for i in 0..m {
        let out_row = &mut out[i * n..(i + 1) * n];
        for p in 0..k {
            let a_ip = a[i * k + p];
            let b_row = &b[p * n..(p + 1) * n];
            for (o, &b_pj) in out_row.iter_mut().zip(b_row) {
                *o += a_ip * b_pj;
            }
        }
    }
    Ok(out)
}

pub(crate) fn transpose_kernel(data: &[f32], rows: usize, cols: usize) -> Result<Vec<f32>, TrebuchetError> {
    let mut out = alloc_filled(rows * cols, 0.0)?;
    for i in 0..rows {
        for j in 0..cols {
            out[j * rows + i] = data[i * cols + j];
        }
    }
    Ok(out)
}

/// Matrix product of two 2-D tensors, `[m, k] x [k, n] -> [m, n]`.
///
/// # Errors
/// `ShapeMismatch` if either input is not 2-D or the inner dimensions differ.
pub fn matmul_op(graph: &mut Graph, a: NodeId, b: NodeId) -> Result<NodeId, TrebuchetError> {
    let (m, k) = matrix_dims(graph.shape(a)?, "matmul")?;
    let (k2, n) = matrix_dims(graph.shape(b)?, "matmul")?;
    if k != k2 {
        return Err(TrebuchetError::ShapeMismatch {
            expected: vec![k, n],
            actual: vec![k2, n],
            operation: "matmul".to_string(),
        });
    }
    let output = matmul_kernel(graph.data(a)?, graph.data(b)?, m, k, n)?;
    graph.push_op(output, vec![m, n], OpKind::Matmul, vec![a, b], OpCache::None)
}

pub(crate) fn matmul_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let a = input_of(graph, id, 0)?;
    let b = input_of(graph, id, 1)?;
    let (m, k) = matrix_dims(graph.shape(a)?, "matmul backward")?;
    let (_, n) = matrix_dims(graph.shape(b)?, "matmul backward")?;
    let data_a = graph.data(a)?;
    let data_b = graph.data(b)?;

    // dA = G . B^T
    let grad_a = if graph.requires_grad(a)? {
        let mut grad_a = alloc_filled(m * k, 0.0)?;
        for i in 0..m {
            let g_row = &grad[i * n..(i + 1) * n];
            for p in 0..k {
                let b_row = &data_b[p * n..(p + 1) * n];
                grad_a[i * k + p] = g_row.iter().zip(b_row).map(|(g, b)| g * b).sum();
            }
        }
        Some(grad_a)
    } else {
        None
    };

    // dB = A^T . G
    let grad_b = if graph.requires_grad(b)? {
        let mut grad_b = alloc_filled(k * n, 0.0)?;
        for i in 0..m {
            let g_row = &grad[i * n..(i + 1) * n];
            for p in 0..k {
                let a_ip = data_a[i * k + p];
                let gb_row = &mut grad_b[p * n..(p + 1) * n];
                for (gb, &g) in gb_row.iter_mut().zip(g_row) {
                    *gb += a_ip * g;
                }
            }
        }
        Some(grad_b)
    } else {
        None
    };

    Ok(vec![grad_a, grad_b])
}

/// Swaps the two axes of a 2-D tensor.
pub fn transpose_op(graph: &mut Graph, a: NodeId) -> Result<NodeId, TrebuchetError> {
    let (rows, cols) = matrix_dims(graph.shape(a)?, "transpose")?;
    let output = transpose_kernel(graph.data(a)?, rows, cols)?;
    graph.push_op(output, vec![cols, rows], OpKind::Transpose, vec![a], OpCache::None)
}

pub(crate) fn transpose_backward(graph: &Graph, id: NodeId) -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
    let grad = output_grad(graph, id)?;
    let (rows, cols) = matrix_dims(graph.shape(id)?, "transpose backward")?;
    Ok(vec![Some(transpose_kernel(grad, rows, cols)?)])
}

#[cfg(test)]
#[path = "linalg_test.rs"]
mod tests;
