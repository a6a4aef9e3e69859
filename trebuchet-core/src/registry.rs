//! Name-based lookup of operations, layers and optimizers.

use crate::autograd::{Graph, NodeId};
use crate::error::TrebuchetError;
use crate::nn::LayerKind;
use crate::ops::{self, OpKind};
use crate::optim::OptimizerKind;
use once_cell::sync::Lazy;
use std::collections::HashMap;

static GLOBAL_REGISTRY: Lazy<Registry> = Lazy::new(Registry::with_builtins);

/// Maps string keys to the closed sets of operations, layers and optimizers.
///
/// A registry is filled once and then only read. Keys are case-sensitive;
/// registering an existing key replaces its entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    ops: HashMap<String, OpKind>,
    layers: HashMap<String, LayerKind>,
    optimizers: HashMap<String, OptimizerKind>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in name.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.init_builtins();
        registry
    }

    /// The process-wide registry with the built-ins, built on first use.
    pub fn global() -> &'static Registry {
        &GLOBAL_REGISTRY
    }

    /// Registers every built-in name. Calling it again leaves the tables unchanged.
    pub fn init_builtins(&mut self) {
        for kind in OpKind::ALL {
            self.register_op(kind.name(), kind);
        }
        for kind in LayerKind::ALL {
            self.register_layer(kind.name(), kind);
        }
        for kind in OptimizerKind::ALL {
            self.register_optimizer(kind.name(), kind);
        }
        log::debug!(
            "registry: {} ops, {} layers, {} optimizers",
            self.ops.len(),
            self.layers.len(),
            self.optimizers.len()
        );
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.ops.clear();
        self.layers.clear();
        self.optimizers.clear();
    }

    pub fn register_op(&mut self, name: impl Into<String>, kind: OpKind) {
        self.ops.insert(name.into(), kind);
    }

    pub fn register_layer(&mut self, name: impl Into<String>, kind: LayerKind) {
        self.layers.insert(name.into(), kind);
    }

    pub fn register_optimizer(&mut self, name: impl Into<String>, kind: OptimizerKind) {
        self.optimizers.insert(name.into(), kind);
    }

    pub fn op(&self, name: &str) -> Result<OpKind, TrebuchetError> {
        self.ops
            .get(name)
            .copied()
            .ok_or_else(|| TrebuchetError::UnknownOperation(name.to_string()))
    }

    pub fn layer(&self, name: &str) -> Result<LayerKind, TrebuchetError> {
        self.layers
            .get(name)
            .copied()
            .ok_or_else(|| TrebuchetError::UnknownLayer(name.to_string()))
    }

    pub fn optimizer(&self, name: &str) -> Result<OptimizerKind, TrebuchetError> {
        self.optimizers
            .get(name)
            .copied()
            .ok_or_else(|| TrebuchetError::UnknownOptimizer(name.to_string()))
    }

    /// Looks up `name` and applies the operation to `inputs`.
    pub fn call_op(&self, name: &str, graph: &mut Graph, inputs: &[NodeId]) -> Result<NodeId, TrebuchetError> {
        ops::forward(self.op(name)?, graph, inputs)
    }

    /// Registered operation names, sorted.
    pub fn op_names(&self) -> Vec<&str> {
        sorted_keys(&self.ops)
    }

    pub fn layer_names(&self) -> Vec<&str> {
        sorted_keys(&self.layers)
    }

    pub fn optimizer_names(&self) -> Vec<&str> {
        sorted_keys(&self.optimizers)
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
