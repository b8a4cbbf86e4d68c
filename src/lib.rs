//! Classifies an image with a frozen image-classification graph and ranks
//! the result against a label list.
//!
//! The pipeline is two graph runs: a preprocessing graph turning encoded
//! image bytes into a normalized `[1, 224, 224, 3]` batch, then the
//! classification graph producing a probability per class. Both go through
//! the [`Engine`] trait, [`TractEngine`] being the stock implementation.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod labels;
pub mod preprocess;
pub mod rank;

pub use crate::classify::Classifier;
pub use crate::config::{Config, ModelFormat};
pub use crate::engine::{Engine, TractEngine};
pub use crate::error::{Error, Result};
pub use crate::labels::LabelTable;
pub use crate::preprocess::Preprocessor;
pub use crate::rank::{top_k, LabeledScore};

/// Runs one image file through `config`'s model, returning its `top_k`
/// best labels.
pub fn classify_file(config: &Config, image: impl AsRef<Path>) -> Result<Vec<LabeledScore>> {
    let image = image.as_ref();
    let bytes = fs::read(image).map_err(|e| Error::input("image", image, e))?;
    let classifier = Classifier::load(TractEngine::new(), config)?;
    let preprocessor = Preprocessor::new(TractEngine::new())?;
    let tensor = preprocessor.normalize(&bytes)?;
    classifier.classify(tensor)
}

/// Prints the first `display` scores, one per line, between blank lines.
pub fn report(out: &mut impl Write, scores: &[LabeledScore], display: usize) -> io::Result<()> {
    write!(out, "\n\n")?;
    for score in scores.iter().take(display) {
        writeln!(out, "{score}")?;
    }
    write!(out, "\n\n")
}
