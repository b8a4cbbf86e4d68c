use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::ops::Deref;
use std::path::Path;

use crate::error::{Error, Result};

/// Human readable class names. Line `i` of the label file names class `i`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn load(path: impl AsRef<Path>) -> Result<LabelTable> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::input("labels", path, e))?;
        LabelTable::from_reader(BufReader::new(file)).map_err(|e| Error::input("labels", path, e))
    }

    /// Reads one label per line. Fails on invalid UTF-8.
    pub fn from_reader(reader: impl BufRead) -> io::Result<LabelTable> {
        let labels = reader.lines().collect::<io::Result<Vec<_>>>()?;
        Ok(LabelTable { labels })
    }
}

impl Deref for LabelTable {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.labels
    }
}

impl FromIterator<String> for LabelTable {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> LabelTable {
        LabelTable { labels: iter.into_iter().collect() }
    }
}
