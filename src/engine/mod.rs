//! The capability the classifier needs from a tensor engine: build a graph,
//! then run it with inputs bound and outputs requested by node name.

use tract_onnx::prelude::*;

use crate::config::ModelFormat;
use crate::graph::OpGraph;

mod kernels;
pub mod tract;

pub use self::tract::TractEngine;

/// What to build.
#[derive(Clone, Debug)]
pub enum GraphSpec {
    Frozen(FrozenGraph),
    Ops(OpGraph),
}

/// A serialized inference graph with fixed weights.
#[derive(Clone, Debug)]
pub struct FrozenGraph {
    pub model: Vec<u8>,
    pub format: ModelFormat,
    /// Input node names with the `f32` shape each one is fed.
    pub inputs: Vec<(String, Vec<usize>)>,
    pub outputs: Vec<String>,
}

pub trait Engine {
    type Graph;

    fn build_graph(&self, spec: GraphSpec) -> TractResult<Self::Graph>;

    /// Runs `graph` once. Outputs come back in the order of `outputs`.
    fn run(
        &self,
        graph: &Self::Graph,
        inputs: TVec<(&str, Tensor)>,
        outputs: &[&str],
    ) -> TractResult<TVec<Tensor>>;
}
