//! Subprocess scorer.
//!
//! Spawns the configured program once per batch, writes
//! `{"query": ..., "records": [...]}` to its stdin and expects a JSON array
//! of numbers on stdout. Large requests are split into batches of at most
//! `batch_size` records; scores are concatenated in input order.
//!
//! The request is written from a separate thread while the child's stdout
//! and stderr are drained, so a scorer that logs heavily before it has read
//! its whole input cannot block on a full pipe.

use std::io::Write;
use std::process::{Command, Stdio};
use std::thread;

use serde::Serialize;
use tracing::debug;

use super::Scorer;
use crate::error::{HStatError, Result};
use crate::types::Record;

#[derive(Serialize)]
struct ScoreRequest<'a> {
    query: &'a str,
    records: &'a [Record],
}

/// Scorer backed by an external process (e.g. a Python ranker wrapper).
///
/// Every batch starts a fresh process, and a single-feature PDP alone is
/// `n` batches. A model that is slow to load pays that cost on every call;
/// for such models implement [`Scorer`] over a long-lived process or
/// service instead.
#[derive(Debug, Clone)]
pub struct CommandScorer {
    program: String,
    args: Vec<String>,
    batch_size: usize,
    /// Number of process invocations so far
    calls: usize,
}

impl CommandScorer {
    pub fn new(program: impl Into<String>, args: Vec<String>, batch_size: usize) -> Self {
        Self {
            program: program.into(),
            args,
            batch_size: batch_size.max(1),
            calls: 0,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }

    fn score_batch(&mut self, query: &str, records: &[Record]) -> Result<Vec<f64>> {
        let payload = serde_json::to_vec(&ScoreRequest { query, records })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| HStatError::Scoring(format!("failed to execute {}: {}", self.program, e)))?;

        let stdin = child.stdin.take();
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || -> std::io::Result<()> {
                if let Some(mut stdin) = stdin {
                    stdin.write_all(&payload)?;
                }
                Ok(())
            });
            let output = child.wait_with_output();
            (writer.join(), output)
        });

        let output = output
            .map_err(|e| HStatError::Scoring(format!("failed to read scorer output: {}", e)))?;
        self.calls += 1;
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(HStatError::Scoring(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(HStatError::Scoring(format!(
                    "failed to write request to {}: {}: {}",
                    self.program,
                    e,
                    stderr.trim()
                )));
            }
            Err(_) => {
                return Err(HStatError::Scoring("request writer thread panicked".into()));
            }
        }

        let scores: Vec<f64> = serde_json::from_slice(&output.stdout)
            .map_err(|e| HStatError::Scoring(format!("malformed scorer output: {}", e)))?;

        if scores.len() != records.len() {
            return Err(HStatError::ScoreCount {
                expected: records.len(),
                actual: scores.len(),
            });
        }

        Ok(scores)
    }
}

impl Scorer for CommandScorer {
    fn score(&mut self, query: &str, records: &[Record]) -> Result<Vec<f64>> {
        let mut scores = Vec::with_capacity(records.len());
        for chunk in records.chunks(self.batch_size) {
            debug!(records = chunk.len(), "scoring batch");
            scores.extend(self.score_batch(query, chunk)?);
        }
        Ok(scores)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| json!({ "year": 2000 + i }).as_object().cloned().unwrap())
            .collect()
    }

    /// Shell scorer that answers with `n` ones regardless of input.
    fn constant_scorer(n: usize, batch_size: usize) -> CommandScorer {
        let ones = vec!["1.0"; n].join(",");
        CommandScorer::new(
            "sh",
            vec!["-c".into(), format!("cat > /dev/null; echo '[{}]'", ones)],
            batch_size,
        )
    }

    #[test]
    fn test_batches_preserve_count() {
        let mut scorer = constant_scorer(2, 2);
        let scores = scorer.score("q", &records(6)).unwrap();
        assert_eq!(scores, vec![1.0; 6]);
        assert_eq!(scorer.calls(), 3);
    }

    #[test]
    fn test_wrong_count_is_error() {
        let mut scorer = constant_scorer(2, 10);
        let err = scorer.score("q", &records(3)).unwrap_err();
        assert!(matches!(err, HStatError::ScoreCount { expected: 3, actual: 2 }));
    }

    #[test]
    fn test_failing_process_is_scoring_error() {
        let mut scorer = CommandScorer::new("sh", vec!["-c".into(), "exit 3".into()], 10);
        let err = scorer.score("q", &records(1)).unwrap_err();
        assert!(matches!(err, HStatError::Scoring(_)));
        assert!(!err.is_task_local());
    }

    #[test]
    fn test_chatty_stderr_before_reading_input() {
        let mut scorer = CommandScorer::new(
            "sh",
            vec![
                "-c".into(),
                "head -c 200000 /dev/zero >&2; cat > /dev/null; echo '[1.0]'".into(),
            ],
            10,
        );
        let big = json!({ "abstract": "x".repeat(200_000) })
            .as_object()
            .cloned()
            .unwrap();

        assert_eq!(scorer.score("q", &[big]).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_early_exit_reports_stderr() {
        let mut scorer = CommandScorer::new(
            "sh",
            vec!["-c".into(), "exec 0<&-; echo 'model missing' >&2; exit 2".into()],
            10,
        );
        let big = json!({ "abstract": "x".repeat(200_000) })
            .as_object()
            .cloned()
            .unwrap();

        let err = scorer.score("q", &[big]).unwrap_err();
        assert!(matches!(err, HStatError::Scoring(_)));
        assert!(err.to_string().contains("model missing"));
    }

    #[test]
    fn test_missing_program_is_scoring_error() {
        let mut scorer = CommandScorer::new("/nonexistent/hstat-scorer", vec![], 10);
        assert!(matches!(
            scorer.score("q", &records(1)),
            Err(HStatError::Scoring(_))
        ));
    }
}
