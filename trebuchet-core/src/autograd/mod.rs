//! Reverse-mode automatic differentiation over an arena graph.

pub mod backward;
pub mod grad_check;
pub mod graph;

pub use grad_check::{check_gradients, GradCheckConfig, GradCheckError};
pub use graph::{topological_sort, Graph, Node, NodeId};
