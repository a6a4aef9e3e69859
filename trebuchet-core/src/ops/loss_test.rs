use super::*;
use crate::utils::testing::{create_test_tensor, create_test_tensor_with_grad};
use approx::assert_relative_eq;

#[test]
fn test_mse_value_and_grad() -> Result<(), TrebuchetError> {
    let mut graph = Graph::new();
    let pred = graph.leaf(create_test_tensor_with_grad(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]));
    let target = graph.leaf(create_test_tensor(vec![1.0, 0.0, 3.0, 2.0], vec![2, 2]));
    let loss = mse_op(&mut graph, pred, target)?;
    assert!(graph.shape(loss)?.is_empty());
    assert_relative_eq!(graph.tensor(loss)?.item()?, 2.0, epsilon = 1e-6);

    graph.backward(loss)?;
    assert_eq!(graph.grad(pred)?, Some(vec![0.0, 1.0, 0.0, 1.0]));
    assert_eq!(graph.grad(target)?, None);
    Ok(())
}

#[test]
fn test_mse_of_equal_tensors_is_zero() -> Result<(), TrebuchetError> {
    let mut graph = Graph::new();
    let pred = graph.leaf(create_test_tensor_with_grad(vec![0.3, -0.7], vec![2]));
    let target = graph.leaf(create_test_tensor(vec![0.3, -0.7], vec![2]));
    let loss = mse_op(&mut graph, pred, target)?;
    assert_relative_eq!(graph.tensor(loss)?.item()?, 0.0);
    graph.backward(loss)?;
    assert_eq!(graph.grad(pred)?, Some(vec![0.0, 0.0]));
    Ok(())
}

#[test]
fn test_loss_shape_mismatch() {
    let mut graph = Graph::new();
    let pred = graph.leaf(create_test_tensor(vec![0.5; 4], vec![2, 2]));
    let target = graph.leaf(create_test_tensor(vec![0.5; 4], vec![4]));
    assert!(matches!(
        mse_op(&mut graph, pred, target),
        Err(TrebuchetError::ShapeMismatch { .. })
    ));
    assert!(cross_entropy_op(&mut graph, pred, target).is_err());
    assert!(binary_cross_entropy_op(&mut graph, pred, target).is_err());
    assert!(softmax_cross_entropy_op(&mut graph, pred, target).is_err());
}

#[test]
fn test_cross_entropy_averages_over_rows() -> Result<(), TrebuchetError> {
    let mut graph = Graph::new();
    let pred = graph.leaf(create_test_tensor_with_grad(
        vec![0.7, 0.2, 0.1, 0.25, 0.5, 0.25],
        vec![2, 3],
    ));
    let target = graph.leaf(create_test_tensor(
        vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        vec![2, 3],
    ));
    let loss = cross_entropy_op(&mut graph, pred, target)?;
    let expected = -(0.7f32.ln() + 0.5f32.ln()) / 2.0;
    assert_relative_eq!(graph.tensor(loss)?.item()?, expected, epsilon = 1e-6);

    graph.backward(loss)?;
    let grad = graph.grad(pred)?.expect("pred requires grad");
    assert_relative_eq!(grad[0], -1.0 / (0.7 * 2.0), epsilon = 1e-6);
    assert_relative_eq!(grad[4], -1.0 / (0.5 * 2.0), epsilon = 1e-6);
    assert_eq!(grad[1], 0.0);
    Ok(())
}

#[test]
fn test_cross_entropy_clamps_zero_probability() -> Result<(), TrebuchetError> {
    let mut graph = Graph::new();
    let pred = graph.leaf(create_test_tensor_with_grad(vec![0.0, 1.0], vec![1, 2]));
    let target = graph.leaf(create_test_tensor(vec![1.0, 0.0], vec![1, 2]));
    let loss = cross_entropy_op(&mut graph, pred, target)?;
    let value = graph.tensor(loss)?.item()?;
    assert!(value.is_finite());
    assert_relative_eq!(value, -(PROBABILITY_EPSILON.ln()), epsilon = 1e-3);

    graph.backward(loss)?;
    assert!(graph
        .grad(pred)?
        .expect("pred requires grad")
        .iter()
        .all(|g| g.is_finite()));
    Ok(())
}

#[test]
fn test_binary_cross_entropy() -> Result<(), TrebuchetError> {
    let mut graph = Graph::new();
    let pred = graph.leaf(create_test_tensor_with_grad(vec![0.8, 0.4], vec![2]));
    let target = graph.leaf(create_test_tensor(vec![1.0, 0.0], vec![2]));
    let loss = binary_cross_entropy_op(&mut graph, pred, target)?;
    let expected = -(0.8f32.ln() + 0.6f32.ln()) / 2.0;
    assert_relative_eq!(graph.tensor(loss)?.item()?, expected, epsilon = 1e-6);

    graph.backward(loss)?;
    let grad = graph.grad(pred)?.expect("pred requires grad");
    assert_relative_eq!(grad[0], (0.8 - 1.0) / (0.8 * 0.2 * 2.0), epsilon = 1e-5);
    assert_relative_eq!(grad[1], 0.4 / (0.4 * 0.6 * 2.0), epsilon = 1e-5);
    Ok(())
}

#[test]
fn test_binary_cross_entropy_saturated_inputs_stay_finite() -> Result<(), TrebuchetError> {
    let mut graph = Graph::new();
    let pred = graph.leaf(create_test_tensor_with_grad(vec![0.0, 1.0], vec![2]));
    let target = graph.leaf(create_test_tensor(vec![1.0, 0.0], vec![2]));
    let loss = binary_cross_entropy_op(&mut graph, pred, target)?;
    assert!(graph.tensor(loss)?.item()?.is_finite());
    graph.backward(loss)?;
    assert!(graph
        .grad(pred)?
        .expect("pred requires grad")
        .iter()
        .all(|g| g.is_finite()));
    Ok(())
}

#[test]
fn test_softmax_cross_entropy_matches_composition() -> Result<(), TrebuchetError> {
    let logits = vec![1.0, 2.0, 0.5, -1.0, 0.0, 3.0];
    let labels = vec![0.0, 1.0, 0.0, 1.0, 0.0, 0.0];

    let mut fused = Graph::new();
    let x = fused.leaf(create_test_tensor_with_grad(logits.clone(), vec![2, 3]));
    let t = fused.leaf(create_test_tensor(labels.clone(), vec![2, 3]));
    let loss = softmax_cross_entropy_op(&mut fused, x, t)?;
    fused.backward(loss)?;

    let mut composed = Graph::new();
    let x2 = composed.leaf(create_test_tensor_with_grad(logits, vec![2, 3]));
    let t2 = composed.leaf(create_test_tensor(labels, vec![2, 3]));
    let probs = crate::ops::softmax_op(&mut composed, x2)?;
    let loss2 = cross_entropy_op(&mut composed, probs, t2)?;
    composed.backward(loss2)?;

    assert_relative_eq!(
        fused.tensor(loss)?.item()?,
        composed.tensor(loss2)?.item()?,
        epsilon = 1e-5
    );
    let g1 = fused.grad(x)?.expect("fused grad");
    let g2 = composed.grad(x2)?.expect("composed grad");
    for (a, b) in g1.iter().zip(&g2) {
        assert_relative_eq!(a, b, epsilon = 1e-5);
    }
    Ok(())
}
