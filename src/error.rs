use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of one stage of a classification run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not read {what} file {}", path.display())]
    Input {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not decode image")]
    Decode(#[source] image::ImageError),
    #[error("could not build graph")]
    Graph(#[source] anyhow::Error),
    #[error("inference failed")]
    Engine(#[source] anyhow::Error),
    #[error("not enough classes: {found} scored labels, {required} required")]
    NotEnoughClasses { found: usize, required: usize },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("could not write result")]
    Output(#[source] io::Error),
}

impl Error {
    pub(crate) fn input(what: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Error {
        Error::Input { what, path: path.into(), source }
    }

    /// Engine failures that started as an undecodable image are reported as
    /// such.
    pub(crate) fn from_engine(err: anyhow::Error) -> Error {
        match err.downcast::<image::ImageError>() {
            Ok(decode) => Error::Decode(decode),
            Err(err) => Error::Engine(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
