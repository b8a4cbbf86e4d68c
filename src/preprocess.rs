use anyhow::anyhow;
use log::debug;
use tract_onnx::prelude::*;

use crate::engine::{Engine, GraphSpec};
use crate::error::{Error, Result};
use crate::graph::{OpGraph, Scope};

/// Side of the square images the classification graph is fed.
pub const INPUT_SIZE: usize = 224;
/// Subtracted from every channel value, approximating the training set mean.
pub const MEAN: f32 = 117.0;

const INPUT: &str = "input";

/// Encoded image bytes to a mean-centered `f32 [1, 224, 224, 3]` batch.
pub fn normalization_graph() -> TractResult<OpGraph> {
    let mut s = Scope::new();
    let input = s.placeholder(INPUT, DatumType::Blob)?;
    let decoded = s.decode_image("decode", input, 3)?;
    let cast = s.cast("cast", decoded, DatumType::F32)?;
    let batch = s.expand_dims("make_batch", cast, 0)?;
    let resized = s.resize_bilinear("size", batch, INPUT_SIZE, INPUT_SIZE)?;
    let output = s.sub_scalar("mean", resized, MEAN)?;
    s.finalize(output)
}

/// Turns raw image files into network input. The graph is built once and
/// reused for every image.
pub struct Preprocessor<E: Engine> {
    engine: E,
    graph: E::Graph,
    output: String,
}

impl<E: Engine> Preprocessor<E> {
    pub fn new(engine: E) -> Result<Preprocessor<E>> {
        let ops = normalization_graph().map_err(Error::Graph)?;
        let output = ops.output_name().to_string();
        let graph = engine.build_graph(GraphSpec::Ops(ops)).map_err(Error::Graph)?;
        Ok(Preprocessor { engine, graph, output })
    }

    pub fn normalize(&self, image: &[u8]) -> Result<Tensor> {
        debug!("Normalizing {} bytes of image", image.len());
        let input = tensor0(Blob::from_bytes(image).map_err(Error::Engine)?);
        let mut outputs = self
            .engine
            .run(&self.graph, tvec!((INPUT, input)), &[self.output.as_str()])
            .map_err(Error::from_engine)?;
        // one output requested, one output expected
        let tensor = outputs
            .pop()
            .ok_or_else(|| Error::Engine(anyhow!("preprocessing produced no output")))?;
        debug!("Normalized to {:?}", tensor.shape());
        Ok(tensor)
    }
}
