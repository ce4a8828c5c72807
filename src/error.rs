//! Error types for PDP computation, caching and experiment processing.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for hstat operations
pub type Result<T> = std::result::Result<T, HStatError>;

/// Errors that can occur while computing or caching H-statistics
#[derive(Debug, Error)]
pub enum HStatError {
    /// Experiment directory does not exist
    #[error("no exp dir {}", .0.display())]
    ExperimentNotFound(PathBuf),

    /// Configuration file unreadable or malformed
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// Sample data file does not exist
    #[error("sample data not found: {}", .0.display())]
    SampleNotFound(PathBuf),

    /// Cached artifact expected on disk but missing
    #[error("artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Scoring backend failed
    #[error("scoring failed: {0}")]
    Scoring(String),

    /// Scoring backend returned the wrong number of scores
    #[error("scorer returned {actual} scores for {expected} records")]
    ScoreCount { expected: usize, actual: usize },

    /// Cached vector does not line up with the sample
    #[error("artifact {} has {actual} values, sample has {expected} records", path.display())]
    ArtifactShape {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    /// Diagonal PDP carries no energy, so H is undefined
    #[error("degenerate interaction for ({f1}, {f2}): diagonal PDP carries no energy")]
    DegenerateInteraction { f1: String, f2: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Reading an .npz artifact failed
    #[error("npz read error: {0}")]
    NpzRead(#[from] ndarray_npy::ReadNpzError),

    /// Writing an .npz artifact failed
    #[error("npz write error: {0}")]
    NpzWrite(#[from] ndarray_npy::WriteNpzError),
}

impl HStatError {
    /// Errors confined to a single (sample, task) pair. The driver logs
    /// these and moves on to sibling tasks; everything else aborts the
    /// experiment.
    pub fn is_task_local(&self) -> bool {
        matches!(
            self,
            HStatError::SampleNotFound(_)
                | HStatError::ArtifactNotFound(_)
                | HStatError::ArtifactShape { .. }
                | HStatError::DegenerateInteraction { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_local_classification() {
        assert!(HStatError::SampleNotFound(PathBuf::from("a.data")).is_task_local());
        assert!(HStatError::ArtifactNotFound(PathBuf::from("a.npz")).is_task_local());
        assert!(HStatError::DegenerateInteraction {
            f1: "year".into(),
            f2: "venue".into()
        }
        .is_task_local());
        assert!(!HStatError::Scoring("backend down".into()).is_task_local());
        assert!(!HStatError::ScoreCount { expected: 3, actual: 2 }.is_task_local());
    }

    #[test]
    fn test_messages_name_identifiers() {
        let err = HStatError::DegenerateInteraction {
            f1: "year".into(),
            f2: "venue".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("year"));
        assert!(msg.contains("venue"));
    }
}
