//! A small, type-checked operation graph for image preprocessing.
//!
//! The graph is built once through a [`Scope`], which checks every operation
//! against the datum type and rank of its operand as it is added. A built
//! [`OpGraph`] is only a description: executing it is the engine's job.

use std::fmt;

use anyhow::{bail, ensure};
use tract_onnx::prelude::{DatumType, TractResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Datum type and rank of a node output. Dimensions are only known at run
/// time, the image size being part of the encoded bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueFact {
    pub datum_type: DatumType,
    pub rank: usize,
}

impl ValueFact {
    fn new(datum_type: DatumType, rank: usize) -> ValueFact {
        ValueFact { datum_type, rank }
    }
}

impl fmt::Display for ValueFact {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?} of rank {}", self.datum_type, self.rank)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    /// Named input, bound at run time.
    Placeholder,
    /// Encoded image bytes to `u8 [height, width, channels]`.
    DecodeImage { channels: usize },
    Cast { to: DatumType },
    ExpandDims { axis: usize },
    /// Direct stretch of `[batch, height, width, channels]`.
    ResizeBilinear { height: usize, width: usize },
    SubScalar { value: f32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub name: String,
    pub op: Op,
    pub input: Option<NodeId>,
    pub fact: ValueFact,
}

/// Graph under construction.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    nodes: Vec<Node>,
}

impl Scope {
    pub fn new() -> Scope {
        Scope::default()
    }

    pub fn placeholder(&mut self, name: &str, datum_type: DatumType) -> TractResult<NodeId> {
        ensure!(
            datum_type == DatumType::Blob,
            "placeholder {name}: only Blob inputs are supported, got {datum_type:?}"
        );
        self.add(name, Op::Placeholder, None, ValueFact::new(datum_type, 0))
    }

    pub fn decode_image(
        &mut self,
        name: &str,
        input: NodeId,
        channels: usize,
    ) -> TractResult<NodeId> {
        let fact = self.fact(input)?;
        ensure!(
            fact == ValueFact::new(DatumType::Blob, 0),
            "decode_image {name}: expects a Blob scalar, got {fact}"
        );
        ensure!(
            channels == 1 || channels == 3,
            "decode_image {name}: can only produce 1 or 3 channels, not {channels}"
        );
        self.add(name, Op::DecodeImage { channels }, Some(input), ValueFact::new(DatumType::U8, 3))
    }

    pub fn cast(&mut self, name: &str, input: NodeId, to: DatumType) -> TractResult<NodeId> {
        let fact = self.fact(input)?;
        for dt in [fact.datum_type, to] {
            if !matches!(dt, DatumType::U8 | DatumType::F32) {
                bail!("cast {name}: unsupported datum type {dt:?}");
            }
        }
        self.add(name, Op::Cast { to }, Some(input), ValueFact::new(to, fact.rank))
    }

    pub fn expand_dims(&mut self, name: &str, input: NodeId, axis: usize) -> TractResult<NodeId> {
        let fact = self.fact(input)?;
        ensure!(
            fact.datum_type != DatumType::Blob,
            "expand_dims {name}: operand is not a numeric tensor"
        );
        ensure!(axis <= fact.rank, "expand_dims {name}: axis {axis} out of range for {fact}");
        let fact = ValueFact::new(fact.datum_type, fact.rank + 1);
        self.add(name, Op::ExpandDims { axis }, Some(input), fact)
    }

    pub fn resize_bilinear(
        &mut self,
        name: &str,
        input: NodeId,
        height: usize,
        width: usize,
    ) -> TractResult<NodeId> {
        let fact = self.fact(input)?;
        ensure!(
            fact == ValueFact::new(DatumType::F32, 4),
            "resize_bilinear {name}: expects a batch of F32 images (rank 4), got {fact}"
        );
        ensure!(height > 0 && width > 0, "resize_bilinear {name}: empty target size");
        self.add(name, Op::ResizeBilinear { height, width }, Some(input), fact)
    }

    pub fn sub_scalar(&mut self, name: &str, input: NodeId, value: f32) -> TractResult<NodeId> {
        let fact = self.fact(input)?;
        ensure!(fact.datum_type == DatumType::F32, "sub_scalar {name}: expects F32, got {fact}");
        self.add(name, Op::SubScalar { value }, Some(input), fact)
    }

    /// Close the scope, designating `output` as the graph result.
    pub fn finalize(self, output: NodeId) -> TractResult<OpGraph> {
        self.fact(output)?;
        ensure!(
            self.nodes.iter().any(|n| n.op == Op::Placeholder),
            "graph has no placeholder"
        );
        Ok(OpGraph { nodes: self.nodes, output })
    }

    fn fact(&self, id: NodeId) -> TractResult<ValueFact> {
        match self.nodes.get(id.0) {
            Some(node) => Ok(node.fact),
            None => bail!("node {id} does not belong to this scope"),
        }
    }

    fn add(
        &mut self,
        name: &str,
        op: Op,
        input: Option<NodeId>,
        fact: ValueFact,
    ) -> TractResult<NodeId> {
        ensure!(!name.is_empty(), "nodes must be named");
        if self.nodes.iter().any(|n| n.name == name) {
            bail!("node name {name} already used in scope");
        }
        self.nodes.push(Node { name: name.to_string(), op, input, fact });
        Ok(NodeId(self.nodes.len() - 1))
    }
}

/// A finalized graph. Nodes are stored in construction order, which is a
/// valid evaluation order.
#[derive(Clone, Debug, PartialEq)]
pub struct OpGraph {
    nodes: Vec<Node>,
    output: NodeId,
}

impl OpGraph {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter(|n| n.op == Op::Placeholder).map(|n| &*n.name)
    }

    pub fn output_name(&self) -> &str {
        &self.node(self.output).name
    }

    /// How many nodes read each node's value.
    pub(crate) fn consumers(&self) -> Vec<usize> {
        let mut counts = vec![0; self.nodes.len()];
        for input in self.nodes.iter().filter_map(|n| n.input) {
            counts[input.0] += 1;
        }
        counts
    }
}
