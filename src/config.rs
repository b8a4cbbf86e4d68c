use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

pub const DEFAULT_MODEL_PATH: &str = "model/tensorflow_inception_graph.pb";
pub const DEFAULT_LABELS_PATH: &str = "model/imagenet_comp_graph_label_strings.txt";
pub const DEFAULT_INPUT_NODE: &str = "input";
pub const DEFAULT_OUTPUT_NODE: &str = "output";
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_DISPLAY: usize = 3;

/// Serialization format of a frozen graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Tensorflow,
    Onnx,
}

impl ModelFormat {
    /// Guess the format from the file extension.
    pub fn guess(path: &Path) -> Option<ModelFormat> {
        match path.extension()?.to_str()? {
            "pb" => Some(ModelFormat::Tensorflow),
            "onnx" => Some(ModelFormat::Onnx),
            _ => None,
        }
    }
}

impl FromStr for ModelFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<ModelFormat> {
        match s.to_ascii_lowercase().as_str() {
            "tf" | "pb" | "tensorflow" => Ok(ModelFormat::Tensorflow),
            "onnx" => Ok(ModelFormat::Onnx),
            other => Err(Error::Config(format!("unknown model format {other:?}"))),
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ModelFormat::Tensorflow => write!(f, "tensorflow"),
            ModelFormat::Onnx => write!(f, "onnx"),
        }
    }
}

/// Where the model and labels live, and how the result is ranked.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
    /// Format hint; guessed from `model_path` when absent.
    pub format: Option<ModelFormat>,
    pub input_node: String,
    pub output_node: String,
    /// Number of entries ranked.
    pub top_k: usize,
    /// Number of ranked entries printed.
    pub display: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            model_path: DEFAULT_MODEL_PATH.into(),
            labels_path: DEFAULT_LABELS_PATH.into(),
            format: None,
            input_node: DEFAULT_INPUT_NODE.to_string(),
            output_node: DEFAULT_OUTPUT_NODE.to_string(),
            top_k: DEFAULT_TOP_K,
            display: DEFAULT_DISPLAY,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::Config("top-k must be at least 1".into()));
        }
        if self.display == 0 {
            return Err(Error::Config("must display at least one label".into()));
        }
        if self.display > self.top_k {
            return Err(Error::Config(format!(
                "cannot display {} labels out of a top {}",
                self.display, self.top_k
            )));
        }
        self.model_format().map(|_| ())
    }

    pub fn model_format(&self) -> Result<ModelFormat> {
        self.format.or_else(|| ModelFormat::guess(&self.model_path)).ok_or_else(|| {
            Error::Config(format!(
                "can not guess model format of {}, use --format",
                self.model_path.display()
            ))
        })
    }
}
