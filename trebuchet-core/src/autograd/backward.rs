use crate::autograd::graph::{topological_sort, Graph, NodeId};
use crate::error::TrebuchetError;
use crate::ops;

impl Graph {
    /// Computes the gradients of `root` with respect to every node it depends on.
    ///
    /// `root` is seeded with a gradient of ones (for a scalar loss this is the
    /// usual `dL/dL = 1`). Gradients are **accumulated**: a node consumed by
    /// several operations receives the sum of all contributions, and parameter
    /// leaves keep adding into their `Parameter` until someone calls `zero_grad`.
    ///
    /// # Errors
    /// * `RequiresGradNotMet` if `root` does not require gradients.
    /// * `GradientAccumulationShapeMismatch` if a backward rule produced a
    ///   gradient of the wrong size.
    pub fn backward(&mut self, root: NodeId) -> Result<(), TrebuchetError> {
        let seed = vec![1.0; self.tensor(root)?.numel()];
        self.backward_with_grad(root, &seed)
    }

    /// Same as [`backward`](Self::backward) with an explicit seed gradient for `root`.
    pub fn backward_with_grad(&mut self, root: NodeId, seed: &[f32]) -> Result<(), TrebuchetError> {
        if !self.requires_grad(root)? {
            return Err(TrebuchetError::RequiresGradNotMet);
        }

        let sorted_nodes = topological_sort(self, root)?;
        log::debug!(
            "backward: {} of {} nodes reachable from node {}",
            sorted_nodes.len(),
            self.len(),
            root.index()
        );

        // Interior gradients are recomputed on every traversal, leaves accumulate.
        for &id in &sorted_nodes {
            let node = self.node_mut(id)?;
            if !node.is_leaf() {
                node.tensor.clear_grad();
            }
        }

        self.accumulate_grad(root, seed)?;

        for &id in sorted_nodes.iter().rev() {
            let node = self.node(id)?;
            if node.is_leaf() {
                continue;
            }
            if node.tensor.grad().is_none() {
                log::trace!("backward: node {} received no gradient", id.index());
                continue;
            }
            let inputs = node.inputs.clone();
            let input_grads = ops::backward(self, id)?;
            if input_grads.len() != inputs.len() {
                return Err(TrebuchetError::InvalidConfiguration(format!(
                    "backward of {:?} returned {} gradients for {} inputs",
                    node.op,
                    input_grads.len(),
                    inputs.len()
                )));
            }
            for (input, grad) in inputs.into_iter().zip(input_grads) {
                if let Some(grad) = grad {
                    if self.requires_grad(input)? {
                        self.accumulate_grad(input, &grad)?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "backward_test.rs"]
mod tests;
