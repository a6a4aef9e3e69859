use trebuchet_core::{Layer, LayerConfig, Network, Optimizer, OptimizerConfig, Registry, TrainConfig, TrebuchetError};
use trebuchet_data::SyntheticClassification;

const INPUT_SIZE: usize = 784;
const HIDDEN_SIZE: usize = 64;
const OUTPUT_SIZE: usize = 10;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn mlp(registry: &Registry) -> Result<Network, TrebuchetError> {
    let mut net = Network::new();
    net.add_layer(Layer::create(registry, &LayerConfig::linear(INPUT_SIZE, HIDDEN_SIZE))?);
    net.add_layer(Layer::create(registry, &LayerConfig::relu())?);
    net.add_layer(Layer::create(registry, &LayerConfig::linear(HIDDEN_SIZE, OUTPUT_SIZE))?);
    net.add_layer(Layer::create(registry, &LayerConfig::softmax())?);
    Ok(net)
}

#[test]
fn mlp_loss_decreases_on_synthetic_digits() -> Result<(), TrebuchetError> {
    init_logger();
    let registry = Registry::with_builtins();
    let (inputs, labels) = SyntheticClassification::new(200, INPUT_SIZE, OUTPUT_SIZE, 42).generate()?;

    let mut net = mlp(&registry)?;
    let mut optimizer = Optimizer::create(&registry, net.parameters(), &OptimizerConfig::sgd(0.01, 0.0))?;
    let config = TrainConfig {
        epochs: 5,
        batch_size: 50,
        loss: "cross_entropy".to_string(),
        verbose: true,
    };
    let history = net.train(&mut optimizer, &inputs, &labels, &config)?;

    assert_eq!(history.epochs.len(), 5);
    assert_eq!(optimizer.step_count(), 20);
    let losses = history.losses();
    assert!(losses.iter().all(|l| l.is_finite()));
    assert!(losses[4] < losses[0], "losses did not decrease: {:?}", losses);

    let predictions = net.predict(&inputs.slice_rows(0, 1)?)?;
    assert_eq!(predictions.shape(), &[1, OUTPUT_SIZE]);
    Ok(())
}

#[test]
fn adam_fits_a_small_problem() -> Result<(), TrebuchetError> {
    init_logger();
    let registry = Registry::with_builtins();
    let (inputs, labels) = SyntheticClassification::new(64, 16, 4, 5).generate()?;

    let mut net = Network::new();
    net.add_layer(Layer::create(&registry, &LayerConfig::linear_seeded(16, 8, 1))?);
    net.add_layer(Layer::create(&registry, &LayerConfig::tanh())?);
    net.add_layer(Layer::create(&registry, &LayerConfig::linear_seeded(8, 4, 2))?);
    net.add_layer(Layer::create(&registry, &LayerConfig::softmax())?);
    let mut optimizer = Optimizer::create(&registry, net.parameters(), &OptimizerConfig::adam(0.01, 0.9, 0.999, 1e-8))?;

    let config = TrainConfig {
        epochs: 30,
        batch_size: 16,
        loss: "cross_entropy".to_string(),
        verbose: false,
    };
    let history = net.train(&mut optimizer, &inputs, &labels, &config)?;
    let last = history.last().map(|s| s.accuracy).unwrap_or(0.0);
    assert!(last >= 0.9, "accuracy after training: {}", last);

    let accuracy = Network::accuracy(&net.predict(&inputs)?, &labels)?;
    assert!(accuracy >= 0.9, "accuracy on the training set: {}", accuracy);
    Ok(())
}
