//! Sample loading seam.
//!
//! A sample is an ordered list of records; PDP output index `i` always
//! refers to record `i`, so loaders must preserve file order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{HStatError, Result};
use crate::types::Record;

/// Data file extension for sample files.
pub const SAMPLE_EXTENSION: &str = "data";

/// Loads the records of a sample.
pub trait SampleSource {
    /// Load the records of `source` stored under `experiment`.
    fn load(&self, experiment: &str, source: &str) -> Result<Vec<Record>>;
}

/// Reads `<root>/<experiment>/<source>.data`, one JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonlSampleSource {
    root: PathBuf,
    /// Max records read; 0 = unlimited
    line_limit: usize,
}

impl JsonlSampleSource {
    pub fn new(root: impl Into<PathBuf>, line_limit: usize) -> Self {
        Self {
            root: root.into(),
            line_limit,
        }
    }

    pub fn path(&self, experiment: &str, source: &str) -> PathBuf {
        self.root
            .join(experiment)
            .join(format!("{}.{}", source, SAMPLE_EXTENSION))
    }

    fn read(&self, path: &Path) -> Result<Vec<Record>> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => HStatError::SampleNotFound(path.to_path_buf()),
            _ => HStatError::Io(e),
        })?;

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            if self.line_limit > 0 && records.len() >= self.line_limit {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str::<Record>(&line)?);
        }

        Ok(records)
    }
}

impl SampleSource for JsonlSampleSource {
    fn load(&self, experiment: &str, source: &str) -> Result<Vec<Record>> {
        let path = self.path(experiment, source);
        let records = self.read(&path)?;
        debug!(path = %path.display(), records = records.len(), "loaded sample");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_sample(root: &Path, exp: &str, name: &str, lines: &[&str]) {
        let dir = root.join(exp);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.data", name)), lines.join("\n")).unwrap();
    }

    #[test]
    fn test_load_preserves_order() {
        let dir = TempDir::new().unwrap();
        write_sample(
            dir.path(),
            "exp1",
            "cslg",
            &[r#"{"year": 2000}"#, "", r#"{"year": 2010}"#, r#"{"year": 2020}"#],
        );

        let source = JsonlSampleSource::new(dir.path(), 0);
        let records = source.load("exp1", "cslg").unwrap();
        let years: Vec<_> = records.iter().map(|r| r["year"].as_i64().unwrap()).collect();
        assert_eq!(years, vec![2000, 2010, 2020]);
    }

    #[test]
    fn test_line_limit() {
        let dir = TempDir::new().unwrap();
        write_sample(
            dir.path(),
            "exp1",
            "cslg",
            &[r#"{"year": 2000}"#, r#"{"year": 2010}"#, r#"{"year": 2020}"#],
        );

        let source = JsonlSampleSource::new(dir.path(), 2);
        assert_eq!(source.load("exp1", "cslg").unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file_is_sample_not_found() {
        let dir = TempDir::new().unwrap();
        let source = JsonlSampleSource::new(dir.path(), 0);
        let err = source.load("exp1", "nope").unwrap_err();
        assert!(matches!(err, HStatError::SampleNotFound(_)));
        assert!(err.is_task_local());
    }
}
