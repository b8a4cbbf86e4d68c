use anyhow::{bail, ensure};
use tract_onnx::prelude::*;
use tract_onnx::prelude::tract_ndarray::{Array3, Array4, Ix4};

use crate::graph::Op;

pub fn eval(op: &Op, mut input: Tensor) -> TractResult<Tensor> {
    match *op {
        Op::Placeholder => bail!("placeholders are bound, not evaluated"),
        Op::DecodeImage { channels } => decode_image(&input, channels),
        Op::Cast { to } => Ok(input.cast_to_dt(to)?.into_owned()),
        Op::ExpandDims { axis } => {
            input.insert_axis(axis)?;
            Ok(input)
        }
        Op::ResizeBilinear { height, width } => resize_bilinear(&input, height, width),
        Op::SubScalar { value } => {
            input.to_array_view_mut::<f32>()?.mapv_inplace(|v| v - value);
            Ok(input)
        }
    }
}

fn decode_image(input: &Tensor, channels: usize) -> TractResult<Tensor> {
    let blob = input.to_scalar::<Blob>()?;
    let image = image::load_from_memory(blob.as_bytes())?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    let raw = match channels {
        1 => image.into_luma8().into_raw(),
        3 => image.into_rgb8().into_raw(),
        _ => bail!("can not decode to {channels} channels"),
    };
    Ok(Array3::from_shape_vec((height, width, channels), raw)?.into_tensor())
}

/// Source coordinates for one output row or column.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Sample {
    lo: usize,
    hi: usize,
    frac: f32,
}

fn samples(input: usize, output: usize) -> Vec<Sample> {
    let scale = input as f32 / output as f32;
    (0..output)
        .map(|o| {
            let src = o as f32 * scale;
            let lo = (src.floor() as usize).min(input - 1);
            let hi = (lo + 1).min(input - 1);
            Sample { lo, hi, frac: src - lo as f32 }
        })
        .collect()
}

// exact when both ends are equal
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Stretches every image of an `[N, H, W, C]` batch to `height` x `width`,
/// blending the four nearest source pixels.
fn resize_bilinear(input: &Tensor, height: usize, width: usize) -> TractResult<Tensor> {
    let input = input.to_array_view::<f32>()?.into_dimensionality::<Ix4>()?;
    let (batch, in_height, in_width, channels) = input.dim();
    ensure!(in_height > 0 && in_width > 0, "can not resize an empty image");
    let ys = samples(in_height, height);
    let xs = samples(in_width, width);
    let output = Array4::from_shape_fn((batch, height, width, channels), |(b, y, x, c)| {
        let (sy, sx) = (ys[y], xs[x]);
        let row = |sy: usize| lerp(input[(b, sy, sx.lo, c)], input[(b, sy, sx.hi, c)], sx.frac);
        lerp(row(sy.lo), row(sy.hi), sy.frac)
    });
    Ok(output.into_tensor())
}
