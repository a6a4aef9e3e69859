use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::nn::layer::{Activation, Layer, LossKind};
use crate::nn::Parameter;
use crate::ops;
use crate::optim::Optimizer;
use crate::tensor::Tensor;

/// Settings of [`Network::train`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    /// Rows per mini-batch; the last batch of an epoch may be shorter.
    pub batch_size: usize,
    /// Registry name of the loss: `mse`, `cross_entropy` or `binary_cross_entropy`.
    pub loss: String,
    /// Report every epoch at `info` level instead of `debug`.
    pub verbose: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            epochs: 10,
            batch_size: 32,
            loss: "cross_entropy".to_string(),
            verbose: false,
        }
    }
}

/// Loss and accuracy of one epoch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    /// Mean loss per sample.
    pub loss: f32,
    /// Fraction of rows whose argmax matches the label's.
    pub accuracy: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochStats>,
}

impl TrainingHistory {
    pub fn first(&self) -> Option<&EpochStats> {
        self.epochs.first()
    }

    pub fn last(&self) -> Option<&EpochStats> {
        self.epochs.last()
    }

    pub fn losses(&self) -> Vec<f32> {
        self.epochs.iter().map(|e| e.loss).collect()
    }
}

/// An ordered stack of layers.
#[derive(Debug, Clone, Default)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Removes and returns the last layer, if any.
    pub fn remove_last_layer(&mut self) -> Option<Layer> {
        self.layers.pop()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    /// All parameters in layer order, each layer's weight before its bias.
    pub fn parameters(&self) -> Vec<Parameter> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }

    pub fn zero_grad(&self) {
        for layer in &self.layers {
            layer.zero_grad();
        }
    }

    /// Chains every layer, feeding each output to the next one.
    pub fn forward(&self, graph: &mut Graph, input: NodeId) -> Result<NodeId, TrebuchetError> {
        forward_layers(self.layers.iter(), graph, input)
    }

    /// Layers producing the prediction; loss layers are left out.
    fn prediction_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().filter(|l| !matches!(l, Layer::Loss(_)))
    }

    /// Runs the network on `input` in a throwaway graph and returns its output.
    pub fn predict(&self, input: &Tensor) -> Result<Tensor, TrebuchetError> {
        let mut graph = Graph::new();
        let x = graph.leaf(input.detach());
        let output = forward_layers(self.prediction_layers(), &mut graph, x)?;
        graph.value(output)
    }

    /// Fraction of rows where `predictions` and `labels` agree on the argmax.
    pub fn accuracy(predictions: &Tensor, labels: &Tensor) -> Result<f32, TrebuchetError> {
        if predictions.shape() != labels.shape() {
            return Err(TrebuchetError::shape_mismatch(
                labels.shape(),
                predictions.shape(),
                "accuracy",
            ));
        }
        let predicted = predictions.argmax_rows()?;
        if predicted.is_empty() {
            return Ok(0.0);
        }
        let correct = count_matches(&predicted, &labels.argmax_rows()?);
        Ok(correct as f32 / predicted.len() as f32)
    }

    /// Mini-batch training.
    ///
    /// Every batch gets its own graph: forward, loss, backward, one optimizer
    /// step, then the gradients of every network parameter are zeroed. When
    /// the network ends in a softmax and the loss is `cross_entropy`, the
    /// softmax and the loss are computed by the fused `softmax_cross_entropy`
    /// op.
    ///
    /// # Errors
    /// `InvalidConfiguration` for a zero batch size or inputs and labels with
    /// different row counts, `UnknownOperation` for an unknown loss, plus
    /// anything raised by the layers, the loss or the optimizer.
    pub fn train(
        &mut self,
        optimizer: &mut Optimizer,
        inputs: &Tensor,
        labels: &Tensor,
        config: &TrainConfig,
    ) -> Result<TrainingHistory, TrebuchetError> {
        if config.batch_size == 0 {
            return Err(TrebuchetError::InvalidConfiguration(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        let samples = inputs.shape().first().copied().unwrap_or(0);
        if labels.shape().first().copied().unwrap_or(0) != samples {
            return Err(TrebuchetError::InvalidConfiguration(format!(
                "{} input rows but labels have shape {:?}",
                samples,
                labels.shape()
            )));
        }
        let loss_kind = LossKind::from_name(&config.loss)?;

        let layers: Vec<&Layer> = self.prediction_layers().collect();
        let fused = loss_kind == LossKind::CrossEntropy
            && matches!(layers.last(), Some(Layer::Activation(Activation::Softmax)));
        let body = if fused { &layers[..layers.len() - 1] } else { &layers[..] };
        log::debug!(
            "training {} layers on {} samples, loss {}{}",
            layers.len(),
            samples,
            config.loss,
            if fused { " (fused softmax)" } else { "" }
        );

        let mut history = TrainingHistory::default();
        for epoch in 1..=config.epochs {
            let mut total_loss = 0.0f64;
            let mut correct = 0usize;

            for start in (0..samples).step_by(config.batch_size) {
                let end = (start + config.batch_size).min(samples);
                let batch_x = inputs.slice_rows(start, end)?;
                let batch_y = labels.slice_rows(start, end)?;

                let mut graph = Graph::new();
                let x = graph.leaf(batch_x);
                let output = forward_layers(body.iter().copied(), &mut graph, x)?;
                let target = graph.leaf(batch_y);
                let loss = if fused {
                    ops::softmax_cross_entropy_op(&mut graph, output, target)?
                } else {
                    loss_kind.apply(&mut graph, output, target)?
                };

                let loss_value = graph.tensor(loss)?.item()?;
                total_loss += loss_value as f64 * (end - start) as f64;
                // Argmax is unchanged by the softmax, so logits work for the fused path.
                correct += batch_matches(graph.tensor(output)?, graph.tensor(target)?);

                graph.backward(loss)?;
                optimizer.step()?;
                optimizer.zero_grad();
                // Also covers parameters the optimizer does not own.
                self.zero_grad();
                log::trace!("epoch {} batch {}..{}: loss {:.6}", epoch, start, end, loss_value);
            }

            let stats = EpochStats {
                epoch,
                loss: (total_loss / samples.max(1) as f64) as f32,
                accuracy: correct as f32 / samples.max(1) as f32,
            };
            if config.verbose {
                log::info!(
                    "Epoch {}/{} - loss: {:.4} - accuracy: {:.2}%",
                    epoch,
                    config.epochs,
                    stats.loss,
                    stats.accuracy * 100.0
                );
            } else {
                log::debug!(
                    "Epoch {}/{} - loss: {:.4} - accuracy: {:.2}%",
                    epoch,
                    config.epochs,
                    stats.loss,
                    stats.accuracy * 100.0
                );
            }
            history.epochs.push(stats);
        }
        Ok(history)
    }
}

fn forward_layers<'a>(
    layers: impl Iterator<Item = &'a Layer>,
    graph: &mut Graph,
    input: NodeId,
) -> Result<NodeId, TrebuchetError> {
    let mut current = input;
    for layer in layers {
        current = layer.forward(graph, current)?;
    }
    Ok(current)
}

/// Correct rows of a batch; outputs that are not 2-D count as none.
fn batch_matches(output: &Tensor, target: &Tensor) -> usize {
    match (output.argmax_rows(), target.argmax_rows()) {
        (Ok(predicted), Ok(expected)) => count_matches(&predicted, &expected),
        _ => 0,
    }
}

fn count_matches(predicted: &[usize], expected: &[usize]) -> usize {
    predicted.iter().zip(expected).filter(|(p, e)| p == e).count()
}

#[cfg(test)]
#[path = "network_test.rs"]
mod tests;
