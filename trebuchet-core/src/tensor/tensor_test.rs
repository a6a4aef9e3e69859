use super::*;
use approx::assert_relative_eq;

#[test]
fn test_new_checks_length() {
    let err = Tensor::new(vec![1.0, 2.0, 3.0], vec![2, 2]).unwrap_err();
    assert_eq!(
        err,
        TrebuchetError::TensorCreationError {
            data_len: 3,
            shape: vec![2, 2]
        }
    );
}

#[test]
fn test_accessors() -> Result<(), TrebuchetError> {
    let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3])?;
    assert_eq!(t.shape(), &[2, 3]);
    assert_eq!(t.rank(), 2);
    assert_eq!(t.numel(), 6);
    assert_eq!(t.get(&[1, 0])?, 4.0);
    assert!(t.get(&[2, 0]).is_err());
    assert_eq!(Tensor::scalar(3.5).item()?, 3.5);
    assert!(t.item().is_err());
    Ok(())
}

#[test]
fn test_accumulate_grad_allocates_then_adds() -> Result<(), TrebuchetError> {
    let mut t = Tensor::new(vec![0.0; 3], vec![3])?;
    assert!(t.grad().is_none());

    t.accumulate_grad(&[1.0, 2.0, 3.0])?;
    assert_eq!(t.grad(), Some(&[1.0, 2.0, 3.0][..]));

    t.accumulate_grad(&[0.5, 0.5, 0.5])?;
    assert_eq!(t.grad(), Some(&[1.5, 2.5, 3.5][..]));
    Ok(())
}

#[test]
fn test_accumulate_grad_length_mismatch() -> Result<(), TrebuchetError> {
    let mut t = Tensor::new(vec![0.0; 4], vec![2, 2])?;
    let err = t.accumulate_grad(&[1.0, 2.0]).unwrap_err();
    assert!(matches!(
        err,
        TrebuchetError::GradientAccumulationShapeMismatch { .. }
    ));
    assert!(t.grad().is_none());
    Ok(())
}

#[test]
fn test_zero_grad_resets_to_exact_zero() -> Result<(), TrebuchetError> {
    let mut t = Tensor::new(vec![1.0, 2.0], vec![2])?;
    t.zero_grad();
    assert!(t.grad().is_none(), "zero_grad must not allocate");

    t.accumulate_grad(&[3.0, -4.0])?;
    t.zero_grad();
    assert_eq!(t.grad(), Some(&[0.0, 0.0][..]));
    t.zero_grad();
    assert_eq!(t.grad(), Some(&[0.0, 0.0][..]));
    Ok(())
}

#[test]
fn test_slice_rows() -> Result<(), TrebuchetError> {
    let t = Tensor::new((0..8).map(|x| x as f32).collect(), vec![4, 2])?;
    let s = t.slice_rows(2, 4)?;
    assert_eq!(s.shape(), &[2, 2]);
    assert_eq!(s.data(), &[4.0, 5.0, 6.0, 7.0]);
    assert!(t.slice_rows(3, 5).is_err());
    Ok(())
}

#[test]
fn test_argmax_rows() -> Result<(), TrebuchetError> {
    let t = Tensor::new(vec![0.1, 0.7, 0.2, 0.5, 0.3, 0.2], vec![2, 3])?;
    assert_eq!(t.argmax_rows()?, vec![1, 0]);
    assert!(Tensor::new(vec![1.0], vec![1])?.argmax_rows().is_err());
    Ok(())
}

#[test]
fn test_detach_drops_autograd_state() -> Result<(), TrebuchetError> {
    let mut t = Tensor::new(vec![1.0, 2.0], vec![2])?.with_requires_grad(true);
    t.accumulate_grad(&[1.0, 1.0])?;
    let d = t.detach();
    assert!(!d.requires_grad());
    assert!(d.grad().is_none());
    assert_relative_eq!(d.data()[1], 2.0);
    Ok(())
}
