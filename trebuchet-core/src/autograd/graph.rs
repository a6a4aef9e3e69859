use crate::error::TrebuchetError;
use crate::nn::Parameter;
use crate::ops::{OpCache, OpKind};
use crate::tensor::Tensor;
use std::collections::{HashMap, HashSet};

/// Handle of a node inside a [`Graph`].
///
/// Handles are only meaningful for the graph that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in its graph's arena.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A tensor living in a graph, together with the operation that produced it.
#[derive(Debug)]
pub struct Node {
    pub(crate) tensor: Tensor,
    /// Generating operation, `None` for leaves.
    pub(crate) op: Option<OpKind>,
    /// Inputs of `op`, always created before this node.
    pub(crate) inputs: Vec<NodeId>,
    /// Op-specific data kept for the backward rule.
    pub(crate) cache: OpCache,
    /// Set for leaves bound to a layer parameter. Gradients reaching this node
    /// are accumulated into the parameter instead of the node.
    pub(crate) param: Option<Parameter>,
}

impl Node {
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    pub fn op(&self) -> Option<OpKind> {
        self.op
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn is_leaf(&self) -> bool {
        self.op.is_none()
    }
}

/// Arena holding the computation graph of one forward/backward epoch.
///
/// Every operation appends a node and returns its [`NodeId`]; nodes are never
/// removed or rewritten, so the inputs of a node always precede it and the
/// graph is acyclic by construction. Dropping the graph releases the whole
/// epoch at once. Parameters are bound by handle and outlive the graph.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    /// Parameter identity -> the leaf it is bound to.
    bound_params: HashMap<usize, NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes recorded so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handles of all nodes in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Adds an external input (or any caller-owned tensor) as a leaf.
    pub fn leaf(&mut self, tensor: Tensor) -> NodeId {
        self.push_node(Node {
            tensor,
            op: None,
            inputs: Vec::new(),
            cache: OpCache::None,
            param: None,
        })
    }

    /// Binds a parameter as a leaf.
    ///
    /// The parameter's current values are snapshotted into the node. Binding the
    /// same parameter twice returns the same node, so shared weights accumulate
    /// their gradients in one place.
    pub fn param(&mut self, parameter: &Parameter) -> NodeId {
        if let Some(&id) = self.bound_params.get(&parameter.id()) {
            return id;
        }
        let mut tensor = parameter.snapshot();
        tensor.requires_grad = true;
        let id = self.push_node(Node {
            tensor,
            op: None,
            inputs: Vec::new(),
            cache: OpCache::None,
            param: Some(parameter.clone()),
        });
        self.bound_params.insert(parameter.id(), id);
        id
    }

    /// Records the output of an operation.
    ///
    /// `requires_grad` of the new node is true iff one of `inputs` requires it.
    pub(crate) fn push_op(
        &mut self,
        data: Vec<f32>,
        shape: Vec<usize>,
        op: OpKind,
        inputs: Vec<NodeId>,
        cache: OpCache,
    ) -> Result<NodeId, TrebuchetError> {
        let requires_grad = inputs
            .iter()
            .map(|&id| self.requires_grad(id))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .any(|rg| rg);
        let tensor = Tensor::new(data, shape)?.with_requires_grad(requires_grad);
        Ok(self.push_node(Node {
            tensor,
            op: Some(op),
            inputs,
            cache,
            param: None,
        }))
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        log::trace!("graph: node {} = {:?} {:?}", id.0, node.op, node.inputs);
        self.nodes.push(node);
        id
    }

    /// Returns the node behind `id`.
    pub fn node(&self, id: NodeId) -> Result<&Node, TrebuchetError> {
        self.nodes.get(id.0).ok_or(TrebuchetError::InvalidNode(id.0))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, TrebuchetError> {
        self.nodes.get_mut(id.0).ok_or(TrebuchetError::InvalidNode(id.0))
    }

    /// Returns the tensor stored in node `id`.
    pub fn tensor(&self, id: NodeId) -> Result<&Tensor, TrebuchetError> {
        Ok(&self.node(id)?.tensor)
    }

    pub fn shape(&self, id: NodeId) -> Result<&[usize], TrebuchetError> {
        Ok(self.tensor(id)?.shape())
    }

    pub fn data(&self, id: NodeId) -> Result<&[f32], TrebuchetError> {
        Ok(self.tensor(id)?.data())
    }

    pub fn requires_grad(&self, id: NodeId) -> Result<bool, TrebuchetError> {
        Ok(self.tensor(id)?.requires_grad())
    }

    /// Detached copy of the value of node `id`.
    pub fn value(&self, id: NodeId) -> Result<Tensor, TrebuchetError> {
        Ok(self.tensor(id)?.detach())
    }

    /// Gradient accumulated for node `id`, if any.
    ///
    /// For a parameter leaf this is the parameter's own gradient buffer, which
    /// may include contributions from earlier graphs until it is zeroed.
    pub fn grad(&self, id: NodeId) -> Result<Option<Vec<f32>>, TrebuchetError> {
        let node = self.node(id)?;
        Ok(match &node.param {
            Some(param) => param.grad(),
            None => node.tensor.grad().map(|g| g.to_vec()),
        })
    }

    /// Adds `grad` into the gradient of node `id` (or of its bound parameter).
    pub(crate) fn accumulate_grad(&mut self, id: NodeId, grad: &[f32]) -> Result<(), TrebuchetError> {
        let node = self.node_mut(id)?;
        match &node.param {
            Some(param) => param.accumulate_grad(grad),
            None => node.tensor.accumulate_grad(grad),
        }
    }

    /// Resets the gradient of node `id` (or of its bound parameter) to zero.
    pub fn zero_grad(&mut self, id: NodeId) -> Result<(), TrebuchetError> {
        let node = self.node_mut(id)?;
        match &node.param {
            Some(param) => param.zero_grad(),
            None => node.tensor.zero_grad(),
        }
        Ok(())
    }

    /// Parameters bound into this graph, in binding order.
    pub fn bound_parameters(&self) -> Vec<Parameter> {
        self.nodes.iter().filter_map(|n| n.param.clone()).collect()
    }
}

/// Orders the nodes reachable from `root` so that every node comes after all
/// the nodes it was computed from (post-order DFS).
///
/// Each node is visited at most once and only inputs that require gradients
/// are followed. Iterating the result in reverse processes consumers before
/// their producers.
pub fn topological_sort(graph: &Graph, root: NodeId) -> Result<Vec<NodeId>, TrebuchetError> {
    let mut visited = HashSet::new();
    let mut sorted_list = Vec::new();
    build_topo(graph, root, &mut visited, &mut sorted_list)?;
    Ok(sorted_list)
}

fn build_topo(
    graph: &Graph,
    node: NodeId,
    visited: &mut HashSet<NodeId>,
    sorted_list: &mut Vec<NodeId>,
) -> Result<(), TrebuchetError> {
    if !visited.insert(node) {
        return Ok(());
    }
    for &input in graph.node(node)?.inputs() {
        if graph.requires_grad(input)? {
            build_topo(graph, input, visited, sorted_list)?;
        }
    }
    sorted_list.push(node);
    Ok(())
}

#[cfg(test)]
#[path = "graph_test.rs"]
mod tests;
