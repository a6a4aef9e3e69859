//! Trains a 784-64-10 classifier on generated digit-like data, then predicts
//! the class of the first sample.
//!
//! Run with `RUST_LOG=info cargo run --example synthetic_mlp`.

use trebuchet_core::{Layer, LayerConfig, Network, Optimizer, OptimizerConfig, Registry, TrainConfig, TrebuchetError};
use trebuchet_data::SyntheticClassification;

const INPUT_SIZE: usize = 784;
const HIDDEN_SIZE: usize = 64;
const OUTPUT_SIZE: usize = 10;

fn run() -> Result<(), TrebuchetError> {
    let registry = Registry::global();
    let (inputs, labels) = SyntheticClassification::new(500, INPUT_SIZE, OUTPUT_SIZE, 42).generate()?;

    let mut net = Network::new();
    net.add_layer(Layer::create(registry, &LayerConfig::linear(INPUT_SIZE, HIDDEN_SIZE))?);
    net.add_layer(Layer::create(registry, &LayerConfig::relu())?);
    net.add_layer(Layer::create(registry, &LayerConfig::linear(HIDDEN_SIZE, OUTPUT_SIZE))?);
    net.add_layer(Layer::create(registry, &LayerConfig::softmax())?);

    let mut optimizer = Optimizer::create(registry, net.parameters(), &OptimizerConfig::sgd(0.01, 0.9))?;
    let config = TrainConfig {
        epochs: 5,
        batch_size: 50,
        loss: "cross_entropy".to_string(),
        verbose: true,
    };

    println!("Training...");
    let history = net.train(&mut optimizer, &inputs, &labels, &config)?;
    for stats in &history.epochs {
        println!(
            "Epoch {}/{}: loss {:.4}, accuracy {:.2}%",
            stats.epoch,
            config.epochs,
            stats.loss,
            stats.accuracy * 100.0
        );
    }

    println!("Inference...");
    let prediction = net.predict(&inputs.slice_rows(0, 1)?)?;
    let predicted = prediction.argmax_rows()?[0];
    let expected = labels.slice_rows(0, 1)?.argmax_rows()?[0];
    println!("Sample 0 - True: {}, Predicted: {}", expected, predicted);
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("synthetic_mlp failed: {}", e);
        std::process::exit(1);
    }
}
