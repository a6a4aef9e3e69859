use trebuchet_core::ops::{add_op, matmul_op, mse_op, mul_op, relu_op, softmax_op};
use trebuchet_core::{Graph, Layer, LayerConfig, Network, Registry, TrebuchetError};

mod common;
use common::{init_logger, tensor, tensor_with_grad};

#[test]
fn every_tracked_node_gets_a_gradient_of_its_size() -> Result<(), TrebuchetError> {
    init_logger();
    let mut graph = Graph::new();
    let x = graph.leaf(tensor(vec![0.2, -0.4, 1.0, 0.7, -0.1, 0.3], vec![2, 3]));
    let w = graph.leaf(tensor_with_grad(vec![0.5, -0.3, 0.8, 0.1, -0.6, 0.9], vec![3, 2]));
    let b = graph.leaf(tensor_with_grad(vec![0.01, -0.02], vec![2]));
    let t = graph.leaf(tensor(vec![0.0, 1.0, 1.0, 0.0], vec![2, 2]));

    let xw = matmul_op(&mut graph, x, w)?;
    let z = add_op(&mut graph, xw, b)?;
    let h = relu_op(&mut graph, z)?;
    let p = softmax_op(&mut graph, h)?;
    let loss = mse_op(&mut graph, p, t)?;
    graph.backward(loss)?;

    for id in graph.node_ids() {
        let value = graph.tensor(id)?;
        match graph.grad(id)? {
            Some(grad) => {
                assert!(value.requires_grad(), "node {} has a gradient but is constant", id.index());
                assert_eq!(grad.len(), value.numel(), "node {}", id.index());
            }
            None => assert!(!value.requires_grad(), "node {} is missing its gradient", id.index()),
        }
    }
    Ok(())
}

#[test]
fn diamond_receives_the_sum_of_both_branches() -> Result<(), TrebuchetError> {
    // y = relu(x) * x + x, x > 0: dy/dx = 2x + 1
    let mut graph = Graph::new();
    let x = graph.leaf(tensor_with_grad(vec![0.5, 2.0, 3.0], vec![3]));
    let r = relu_op(&mut graph, x)?;
    let rx = mul_op(&mut graph, r, x)?;
    let y = add_op(&mut graph, rx, x)?;
    graph.backward(y)?;
    assert_eq!(graph.grad(x)?, Some(vec![2.0, 5.0, 7.0]));
    Ok(())
}

#[test]
fn zero_grad_restores_a_fresh_state_for_network_parameters() -> Result<(), TrebuchetError> {
    init_logger();
    let registry = Registry::with_builtins();
    let mut net = Network::new();
    net.add_layer(Layer::create(&registry, &LayerConfig::linear_seeded(3, 4, 11))?);
    net.add_layer(Layer::create(&registry, &LayerConfig::tanh())?);
    net.add_layer(Layer::create(&registry, &LayerConfig::linear_seeded(4, 2, 12))?);

    let input = tensor(vec![0.1, 0.2, 0.3, -0.4, 0.5, -0.6], vec![2, 3]);
    let target = tensor(vec![1.0, 0.0, 0.0, 1.0], vec![2, 2]);
    let run = |net: &Network| -> Result<Vec<Option<Vec<f32>>>, TrebuchetError> {
        let mut graph = Graph::new();
        let x = graph.leaf(input.clone());
        let out = net.forward(&mut graph, x)?;
        let t = graph.leaf(target.clone());
        let loss = mse_op(&mut graph, out, t)?;
        graph.backward(loss)?;
        Ok(net.parameters().iter().map(|p| p.grad()).collect())
    };

    let fresh = run(&net)?;
    assert!(fresh.iter().all(|g| g.is_some()));

    // Without zeroing, a second pass doubles every gradient.
    let doubled = run(&net)?;
    for (f, d) in fresh.iter().zip(&doubled) {
        let (f, d) = (f.as_ref().expect("grad"), d.as_ref().expect("grad"));
        for (a, b) in f.iter().zip(d) {
            approx::assert_relative_eq!(2.0 * a, *b, epsilon = 1e-6);
        }
    }

    net.zero_grad();
    net.zero_grad();
    for param in net.parameters() {
        assert!(param.grad().expect("kept").iter().all(|&g| g == 0.0));
    }
    assert_eq!(run(&net)?, fresh);
    Ok(())
}
