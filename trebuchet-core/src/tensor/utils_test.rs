use super::*;

#[test]
fn test_calculate_strides() {
    assert_eq!(calculate_strides(&[2, 3]), vec![3, 1]);
    assert_eq!(calculate_strides(&[2, 2, 2]), vec![4, 2, 1]);
    assert!(calculate_strides(&[]).is_empty());
}

#[test]
fn test_broadcast_suffix_equal_shapes() {
    let b = broadcast_suffix(&[2, 3], &[2, 3], "add").unwrap();
    assert_eq!(b.output_shape, vec![2, 3]);
    assert_eq!(b.inner_a, 6);
    assert_eq!(b.inner_b, 6);
}

#[test]
fn test_broadcast_suffix_bias() {
    let b = broadcast_suffix(&[4, 3], &[3], "add").unwrap();
    assert_eq!(b.output_shape, vec![4, 3]);
    assert_eq!(b.inner_b, 3);

    let flipped = broadcast_suffix(&[3], &[4, 3], "add").unwrap();
    assert_eq!(flipped.output_shape, vec![4, 3]);
    assert_eq!(flipped.inner_a, 3);
}

#[test]
fn test_broadcast_suffix_rejects_non_suffix() {
    let err = broadcast_suffix(&[4, 3], &[4], "add").unwrap_err();
    assert_eq!(
        err,
        TrebuchetError::ShapeMismatch {
            expected: vec![4, 3],
            actual: vec![4],
            operation: "add".to_string(),
        }
    );
    assert!(broadcast_suffix(&[2, 3], &[3, 2], "mul").is_err());
}

#[test]
fn test_reduce_to_inner() {
    let grad = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    assert_eq!(reduce_to_inner(&grad, 3), vec![5.0, 7.0, 9.0]);
    assert_eq!(reduce_to_inner(&grad, 6), grad);
}

#[test]
fn test_slice_leading() {
    let data: Vec<f32> = (0..12).map(|x| x as f32).collect();
    let (out, shape) = slice_leading(&data, &[4, 3], 1, 3).unwrap();
    assert_eq!(shape, vec![2, 3]);
    assert_eq!(out, vec![3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
}

#[test]
fn test_slice_leading_invalid_range() {
    let data = vec![0.0; 6];
    assert!(matches!(
        slice_leading(&data, &[3, 2], 2, 4),
        Err(TrebuchetError::SliceError { .. })
    ));
    assert!(matches!(
        slice_leading(&[1.0], &[], 0, 1),
        Err(TrebuchetError::SliceError { .. })
    ));
}

#[test]
fn test_alloc_filled() {
    let buffer = alloc_filled(5, 2.5).unwrap();
    assert_eq!(buffer, vec![2.5; 5]);
}

#[test]
fn test_broadcast_inner_counts_index_operands() {
    let b = broadcast_suffix(&[2, 3], &[3], "add").unwrap();
    let numel: usize = b.output_shape.iter().product();
    let a_index: Vec<usize> = (0..numel).map(|i| i % b.inner_a).collect();
    let b_index: Vec<usize> = (0..numel).map(|i| i % b.inner_b).collect();
    assert_eq!(a_index, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(b_index, vec![0, 1, 2, 0, 1, 2]);
}
