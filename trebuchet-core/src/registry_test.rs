use super::*;
use crate::utils::testing::create_test_tensor;

#[test]
fn test_builtins_are_registered() -> Result<(), TrebuchetError> {
    let registry = Registry::with_builtins();
    assert_eq!(registry.op("matmul")?, OpKind::Matmul);
    assert_eq!(registry.op("softmax_cross_entropy")?, OpKind::SoftmaxCrossEntropy);
    assert_eq!(registry.layer("linear")?, LayerKind::Linear);
    assert_eq!(registry.layer("cross_entropy")?, LayerKind::CrossEntropy);
    assert_eq!(registry.optimizer("adam")?, OptimizerKind::Adam);
    assert_eq!(registry.op_names().len(), OpKind::ALL.len());
    assert_eq!(registry.optimizer_names(), vec!["adam", "sgd"]);
    Ok(())
}

#[test]
fn test_unknown_names() {
    let registry = Registry::with_builtins();
    assert_eq!(
        registry.op("conv").unwrap_err(),
        TrebuchetError::UnknownOperation("conv".to_string())
    );
    assert_eq!(
        registry.layer("Linear").unwrap_err(),
        TrebuchetError::UnknownLayer("Linear".to_string())
    );
    assert_eq!(
        registry.optimizer("lbfgs").unwrap_err(),
        TrebuchetError::UnknownOptimizer("lbfgs".to_string())
    );
}

#[test]
fn test_init_builtins_is_idempotent() {
    let once = Registry::with_builtins();
    let mut twice = Registry::with_builtins();
    twice.init_builtins();
    assert_eq!(once, twice);
}

#[test]
fn test_clear_releases_everything() {
    let mut registry = Registry::with_builtins();
    registry.clear();
    assert_eq!(registry, Registry::new());
    assert!(registry.op("add").is_err());
    registry.init_builtins();
    assert!(registry.op("add").is_ok());
}

#[test]
fn test_custom_alias() -> Result<(), TrebuchetError> {
    let mut registry = Registry::new();
    registry.register_op("plus", OpKind::Add);
    assert_eq!(registry.op("plus")?, OpKind::Add);
    assert!(registry.op("add").is_err());
    Ok(())
}

#[test]
fn test_call_op_by_name() -> Result<(), TrebuchetError> {
    let registry = Registry::global();
    let mut graph = Graph::new();
    let a = graph.leaf(create_test_tensor(vec![1.0, 2.0], vec![2]));
    let b = graph.leaf(create_test_tensor(vec![3.0, 4.0], vec![2]));
    let c = registry.call_op("mul", &mut graph, &[a, b])?;
    assert_eq!(graph.data(c)?, &[3.0, 8.0]);

    let r = registry.call_op("relu", &mut graph, &[c])?;
    assert_eq!(graph.node(r)?.op(), Some(OpKind::Relu));
    Ok(())
}

#[test]
fn test_call_op_checks_arity() {
    let registry = Registry::with_builtins();
    let mut graph = Graph::new();
    let a = graph.leaf(create_test_tensor(vec![1.0], vec![1]));
    assert!(matches!(
        registry.call_op("add", &mut graph, &[a]),
        Err(TrebuchetError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        registry.call_op("slice", &mut graph, &[a]),
        Err(TrebuchetError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        registry.call_op("nope", &mut graph, &[a]),
        Err(TrebuchetError::UnknownOperation(_))
    ));
}
