use std::collections::HashMap;
use std::time::Instant;

use anyhow::{bail, ensure, Context};
use log::{debug, trace};
use tract_onnx::prelude::*;

use super::{kernels, Engine, FrozenGraph, GraphSpec};
use crate::config::ModelFormat;
use crate::graph::{Op, OpGraph};

type Plan = TypedSimplePlan<TypedModel>;

/// A frozen graph, optimized and ready to run.
pub struct FrozenPlan {
    plan: Plan,
    inputs: Vec<String>,
    outputs: Vec<String>,
}

pub enum TractGraph {
    Frozen(FrozenPlan),
    Ops(OpGraph),
}

/// Runs frozen TensorFlow or ONNX graphs with tract, and preprocessing
/// graphs with the `image` crate for decoding.
#[derive(Clone, Copy, Debug, Default)]
pub struct TractEngine;

impl TractEngine {
    pub fn new() -> TractEngine {
        TractEngine
    }

    fn load(&self, spec: &FrozenGraph) -> TractResult<InferenceModel> {
        let mut reader = &*spec.model;
        match spec.format {
            ModelFormat::Onnx => tract_onnx::onnx().model_for_read(&mut reader),
            #[cfg(feature = "tf")]
            ModelFormat::Tensorflow => tract_tensorflow::tensorflow().model_for_read(&mut reader),
            #[cfg(not(feature = "tf"))]
            ModelFormat::Tensorflow => bail!("built without TensorFlow support (feature \"tf\")"),
        }
    }

    fn build_frozen(&self, spec: FrozenGraph) -> TractResult<FrozenPlan> {
        ensure!(!spec.inputs.is_empty(), "frozen graph needs at least one input node");
        ensure!(!spec.outputs.is_empty(), "frozen graph needs at least one output node");
        debug!("Loading {} graph ({} bytes)", spec.format, spec.model.len());
        let start = Instant::now();
        let names = spec.inputs.iter().map(|(name, _)| name);
        let mut model =
            self.load(&spec)?.with_input_names(names)?.with_output_names(&spec.outputs)?;
        for (ix, (name, shape)) in spec.inputs.iter().enumerate() {
            debug!("Input {name}: f32 {shape:?}");
            model.set_input_fact(ix, f32::fact(shape.iter().copied()).into())?;
        }
        let plan = model.into_optimized()?.into_runnable()?;
        debug!("Graph loaded and optimized in {:?}", start.elapsed());
        let inputs = spec.inputs.into_iter().map(|(name, _)| name).collect();
        Ok(FrozenPlan { plan, inputs, outputs: spec.outputs })
    }

    fn run_frozen(
        &self,
        graph: &FrozenPlan,
        inputs: TVec<(&str, Tensor)>,
        outputs: &[&str],
    ) -> TractResult<TVec<Tensor>> {
        let mut bound: Vec<Option<Tensor>> = vec![None; graph.inputs.len()];
        for (name, tensor) in inputs {
            let ix = graph
                .inputs
                .iter()
                .position(|n| n == name)
                .with_context(|| format!("no input node named {name}"))?;
            ensure!(bound[ix].is_none(), "input {name} bound twice");
            bound[ix] = Some(tensor);
        }
        let values = bound
            .into_iter()
            .zip(&graph.inputs)
            .map(|(tensor, name)| {
                tensor
                    .map(|t| t.into_tvalue())
                    .with_context(|| format!("input {name} is not bound"))
            })
            .collect::<TractResult<TVec<TValue>>>()?;
        let start = Instant::now();
        let results = graph.plan.run(values)?;
        debug!("Ran plan in {:?}", start.elapsed());
        outputs
            .iter()
            .map(|name| {
                let ix = graph
                    .outputs
                    .iter()
                    .position(|n| n == name)
                    .with_context(|| format!("no output node named {name}"))?;
                Ok(results[ix].clone().into_tensor())
            })
            .collect()
    }

    fn run_ops(
        &self,
        graph: &OpGraph,
        inputs: TVec<(&str, Tensor)>,
        outputs: &[&str],
    ) -> TractResult<TVec<Tensor>> {
        let mut bindings: HashMap<&str, Tensor> = HashMap::new();
        for (name, tensor) in inputs {
            ensure!(graph.placeholders().any(|p| p == name), "no placeholder named {name}");
            ensure!(bindings.insert(name, tensor).is_none(), "placeholder {name} bound twice");
        }
        let wanted = outputs
            .iter()
            .map(|name| graph.node_by_name(name).with_context(|| format!("no node named {name}")))
            .collect::<TractResult<Vec<_>>>()?;

        // values are dropped as soon as their last reader ran
        let mut remaining = graph.consumers();
        for id in &wanted {
            remaining[id.0] += 1;
        }
        let mut values: Vec<Option<Tensor>> = vec![None; graph.nodes().len()];
        for (ix, node) in graph.nodes().iter().enumerate() {
            trace!("Evaluating {} {:?}", node.name, node.op);
            let value = match (&node.op, node.input) {
                (Op::Placeholder, _) => bindings
                    .remove(&*node.name)
                    .with_context(|| format!("placeholder {} is not bound", node.name))?,
                (op, Some(input)) => {
                    remaining[input.0] -= 1;
                    let operand = if remaining[input.0] == 0 {
                        values[input.0].take()
                    } else {
                        values[input.0].clone()
                    };
                    let operand = operand.with_context(|| format!("{} has no value", input))?;
                    kernels::eval(op, operand)
                        .with_context(|| format!("evaluating node {}", node.name))?
                }
                (op, None) => bail!("node {} ({:?}) has no input", node.name, op),
            };
            values[ix] = Some(value);
        }
        wanted
            .iter()
            .map(|id| values[id.0].clone().with_context(|| format!("{id} has no value")))
            .collect()
    }
}

impl Engine for TractEngine {
    type Graph = TractGraph;

    fn build_graph(&self, spec: GraphSpec) -> TractResult<TractGraph> {
        match spec {
            GraphSpec::Frozen(frozen) => Ok(TractGraph::Frozen(self.build_frozen(frozen)?)),
            GraphSpec::Ops(ops) => {
                debug!(
                    "Preprocessing graph of {} nodes, output {}",
                    ops.nodes().len(),
                    ops.output_name()
                );
                Ok(TractGraph::Ops(ops))
            }
        }
    }

    fn run(
        &self,
        graph: &TractGraph,
        inputs: TVec<(&str, Tensor)>,
        outputs: &[&str],
    ) -> TractResult<TVec<Tensor>> {
        match graph {
            TractGraph::Frozen(plan) => self.run_frozen(plan, inputs, outputs),
            TractGraph::Ops(ops) => self.run_ops(ops, inputs, outputs),
        }
    }
}
