use std::fs;

use anyhow::{anyhow, ensure};
use log::{debug, info};
use tract_onnx::prelude::*;

use crate::config::Config;
use crate::engine::{Engine, FrozenGraph, GraphSpec};
use crate::error::{Error, Result};
use crate::labels::LabelTable;
use crate::preprocess::INPUT_SIZE;
use crate::rank::{top_k, LabeledScore};

/// A loaded classification graph and the names of its classes.
pub struct Classifier<E: Engine> {
    engine: E,
    graph: E::Graph,
    labels: LabelTable,
    input: String,
    output: String,
    top_k: usize,
}

impl<E: Engine> Classifier<E> {
    /// Reads the frozen graph and label file named by `config`.
    pub fn load(engine: E, config: &Config) -> Result<Classifier<E>> {
        config.validate()?;
        let format = config.model_format()?;
        let model = fs::read(&config.model_path)
            .map_err(|e| Error::input("model", &config.model_path, e))?;
        let labels = LabelTable::load(&config.labels_path)?;
        info!("Loaded {} labels from {}", labels.len(), config.labels_path.display());
        let spec = FrozenGraph {
            model,
            format,
            inputs: vec![(config.input_node.clone(), vec![1, INPUT_SIZE, INPUT_SIZE, 3])],
            outputs: vec![config.output_node.clone()],
        };
        let graph = engine.build_graph(GraphSpec::Frozen(spec)).map_err(Error::Graph)?;
        Ok(Classifier::new(engine, graph, labels, config))
    }

    /// Assembles a classifier from an already built graph.
    pub fn new(engine: E, graph: E::Graph, labels: LabelTable, config: &Config) -> Classifier<E> {
        Classifier {
            engine,
            graph,
            labels,
            input: config.input_node.clone(),
            output: config.output_node.clone(),
            top_k: config.top_k,
        }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// One inference pass, returning the probability vector of the single
    /// image in the batch.
    pub fn probabilities(&self, input: Tensor) -> Result<Vec<f32>> {
        let outputs = self
            .engine
            .run(&self.graph, tvec!((&*self.input, input)), &[self.output.as_str()])
            .map_err(Error::from_engine)?;
        let output = outputs
            .into_iter()
            .next()
            .ok_or_else(|| Error::Engine(anyhow!("no output from node {}", self.output)))?;
        first_row(&output).map_err(Error::Engine)
    }

    pub fn classify(&self, input: Tensor) -> Result<Vec<LabeledScore>> {
        let probabilities = self.probabilities(input)?;
        if probabilities.len() != self.labels.len() {
            debug!(
                "{} probabilities for {} labels, ranking the first {}",
                probabilities.len(),
                self.labels.len(),
                probabilities.len().min(self.labels.len())
            );
        }
        let ranked = top_k(&probabilities, &self.labels[..], self.top_k)?;
        for score in &ranked {
            info!("{score}");
        }
        Ok(ranked)
    }
}

/// The last axis holds the classes; the first row along the others is the
/// first image of the batch.
fn first_row(output: &Tensor) -> TractResult<Vec<f32>> {
    let view = output.to_array_view::<f32>()?;
    let classes = view.shape().last().copied().unwrap_or(1);
    ensure!(classes > 0 && view.len() >= classes, "empty output {:?}", view.shape());
    if view.len() > classes {
        debug!("Output {:?} holds more than one row, keeping the first", view.shape());
    }
    Ok(view.iter().take(classes).copied().collect())
}
