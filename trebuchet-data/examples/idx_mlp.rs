//! Trains a 784-256-128-10 classifier with Adam on an IDX dataset.
//!
//! Usage: `cargo run --release --example idx_mlp -- <images.idx3-ubyte> <labels.idx1-ubyte>`

use std::path::PathBuf;
use std::process;
use trebuchet_core::{Layer, LayerConfig, Network, Optimizer, OptimizerConfig, Registry, TrainConfig, TrebuchetError};
use trebuchet_data::{load_idx_images, load_idx_labels};

const CLASSES: usize = 10;

fn build(registry: &Registry, input_size: usize) -> Result<Network, TrebuchetError> {
    let mut net = Network::new();
    net.add_layer(Layer::create(registry, &LayerConfig::linear(input_size, 256))?);
    net.add_layer(Layer::create(registry, &LayerConfig::relu())?);
    net.add_layer(Layer::create(registry, &LayerConfig::linear(256, 128))?);
    net.add_layer(Layer::create(registry, &LayerConfig::relu())?);
    net.add_layer(Layer::create(registry, &LayerConfig::linear(128, CLASSES))?);
    net.add_layer(Layer::create(registry, &LayerConfig::softmax())?);
    Ok(net)
}

fn run(images: PathBuf, labels: PathBuf) -> Result<(), TrebuchetError> {
    let inputs = load_idx_images(&images)?;
    let targets = load_idx_labels(&labels, CLASSES)?;

    let registry = Registry::global();
    let mut net = build(registry, inputs.shape()[1])?;
    let mut optimizer = Optimizer::create(registry, net.parameters(), &OptimizerConfig::adam_default())?;

    let config = TrainConfig {
        epochs: 10,
        batch_size: 64,
        loss: "cross_entropy".to_string(),
        verbose: true,
    };
    let history = net.train(&mut optimizer, &inputs, &targets, &config)?;
    if let Some(last) = history.last() {
        println!("Final loss {:.4}, accuracy {:.2}%", last.loss, last.accuracy * 100.0);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let mut args = std::env::args().skip(1);
    let (Some(images), Some(labels)) = (args.next(), args.next()) else {
        eprintln!("usage: idx_mlp <images.idx3-ubyte> <labels.idx1-ubyte>");
        process::exit(2);
    };
    if let Err(e) = run(PathBuf::from(images), PathBuf::from(labels)) {
        eprintln!("idx_mlp failed: {}", e);
        process::exit(1);
    }
}
