use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trebuchet_core::{Tensor, TrebuchetError};

/// Amplitude of the background noise shared by every sample.
const NOISE_SCALE: f32 = 0.1;

/// A deterministic, linearly separable classification problem.
///
/// Each sample gets a random class, uniform noise in `[0, 0.1)` on every
/// feature and a value of `1.0` on the block of features owned by its class.
/// Features are split into `classes` equal blocks; leftover features only
/// carry noise. The same seed always yields the same tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticClassification {
    pub samples: usize,
    pub features: usize,
    pub classes: usize,
    pub seed: u64,
}

impl SyntheticClassification {
    pub fn new(samples: usize, features: usize, classes: usize, seed: u64) -> Self {
        Self {
            samples,
            features,
            classes,
            seed,
        }
    }

    /// Number of features marking one class.
    pub fn block_width(&self) -> usize {
        if self.classes == 0 {
            return 0;
        }
        (self.features / self.classes).max(1)
    }

    /// Returns `(inputs [samples, features], one_hot_labels [samples, classes])`.
    ///
    /// # Errors
    /// `InvalidConfiguration` if any dimension is zero or there are more
    /// classes than features.
    pub fn generate(&self) -> Result<(Tensor, Tensor), TrebuchetError> {
        if self.samples == 0 || self.features == 0 || self.classes == 0 {
            return Err(TrebuchetError::InvalidConfiguration(format!(
                "synthetic dataset needs non-zero sizes, got {:?}",
                self
            )));
        }
        if self.classes > self.features {
            return Err(TrebuchetError::InvalidConfiguration(format!(
                "{} classes cannot be encoded in {} features",
                self.classes, self.features
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let width = self.block_width();
        let mut inputs = Vec::with_capacity(self.samples * self.features);
        let mut labels = vec![0.0; self.samples * self.classes];

        for sample in 0..self.samples {
            let class = rng.gen_range(0..self.classes);
            labels[sample * self.classes + class] = 1.0;
            let active = class * width..(class + 1) * width;
            for feature in 0..self.features {
                let noise = rng.gen::<f32>() * NOISE_SCALE;
                inputs.push(if active.contains(&feature) { 1.0 } else { noise });
            }
        }
        log::debug!(
            "synthetic: {} samples, {} features, {} classes (seed {})",
            self.samples,
            self.features,
            self.classes,
            self.seed
        );

        Ok((
            Tensor::new(inputs, vec![self.samples, self.features])?,
            Tensor::new(labels, vec![self.samples, self.classes])?,
        ))
    }
}

#[cfg(test)]
#[path = "synthetic_test.rs"]
mod tests;
