//! Experiment driver.
//!
//! Reads an experiment's `conf.yml`, resolves every sample to its data
//! location (its own experiment, or another one via
//! `sample_from_other_exp`), and runs the aggregator once per
//! (sample, task). Failure policy:
//!
//! - sample without a task list: logged, skipped
//! - missing data / artifact, stale artifact, degenerate pair: logged,
//!   sibling tasks continue
//! - anything else (scorer failure, IO): aborts the experiment

use tracing::{info, warn};

use crate::aggregate::{compute_and_save, AggregateOptions};
use crate::cache::{ArtifactStore, Location, SampleScope};
use crate::config::{ExperimentConfig, SampleTarget, Settings};
use crate::error::{HStatError, Result};
use crate::sample::SampleSource;
use crate::scoring::Scorer;

/// Outcome counts for one experiment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExperimentSummary {
    pub experiment: String,
    pub tasks_completed: usize,
    pub tasks_failed: usize,
    pub samples_skipped: usize,
}

/// Runs experiments with one scorer and one sample source.
pub struct Driver<'a, S: Scorer + ?Sized, L: SampleSource + ?Sized> {
    settings: &'a Settings,
    store: ArtifactStore,
    scorer: &'a mut S,
    samples: &'a L,
}

impl<'a, S, L> Driver<'a, S, L>
where
    S: Scorer + ?Sized,
    L: SampleSource + ?Sized,
{
    pub fn new(settings: &'a Settings, scorer: &'a mut S, samples: &'a L) -> Self {
        Self {
            settings,
            store: ArtifactStore::new(settings.data_root.clone()),
            scorer,
            samples,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Process every configured sample and task of `experiment`.
    pub fn run_experiment(&mut self, experiment: &str) -> Result<ExperimentSummary> {
        let exp_dir = self.settings.experiment_dir(experiment);
        if !exp_dir.is_dir() {
            return Err(HStatError::ExperimentNotFound(exp_dir));
        }

        let conf = ExperimentConfig::load(&exp_dir)?;
        if let Some(ref description) = conf.description {
            info!(experiment, description = %description, "loaded experiment config");
        }

        let mut summary = ExperimentSummary {
            experiment: experiment.to_string(),
            ..Default::default()
        };

        for target in conf.targets(experiment) {
            let Some(tasks) = conf.tasks(&target.sample) else {
                warn!(sample = %target.sample, "no config for tested sample");
                summary.samples_skipped += 1;
                continue;
            };

            info!(
                sample = %target.sample,
                data = %format!("{}/{}", target.data_experiment, target.data_source),
                tasks = tasks.len(),
                "computing h-statistics for sample"
            );

            let records = match self
                .samples
                .load(&target.data_experiment, &target.data_source)
            {
                Ok(records) => records,
                Err(e) if e.is_task_local() => {
                    warn!(sample = %target.sample, error = %e, "skipping sample tasks");
                    summary.tasks_failed += tasks.len();
                    continue;
                }
                Err(e) => return Err(e),
            };

            let scope = scope_for(experiment, &target);
            for task in tasks {
                let result = compute_and_save(
                    &self.store,
                    &mut *self.scorer,
                    scope.clone(),
                    &task.query,
                    &records,
                    &self.settings.features,
                    AggregateOptions {
                        lookup: self.settings.cache_lookup,
                        centering: self.settings.centering,
                    },
                );

                match result {
                    Ok(_) => summary.tasks_completed += 1,
                    Err(e) if e.is_task_local() => {
                        warn!(sample = %target.sample, query = %task.query, error = %e, "task failed");
                        summary.tasks_failed += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        info!(
            experiment,
            completed = summary.tasks_completed,
            failed = summary.tasks_failed,
            skipped_samples = summary.samples_skipped,
            "experiment done"
        );
        Ok(summary)
    }
}

/// Output under the current experiment; reusable PDPs under the data's
/// home experiment.
fn scope_for(experiment: &str, target: &SampleTarget) -> SampleScope {
    SampleScope {
        output: Location::new(experiment, &target.sample),
        source: Location::new(&target.data_experiment, &target.data_source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::JsonlSampleSource;
    use crate::test_support::{additive, zero};
    use crate::types::Record;
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const SAMPLE_LINES: &str = r#"{"title": "a", "year": 2000, "n_citations": 0}
{"title": "b", "year": 2010, "n_citations": 5}
{"title": "c", "year": 2020, "n_citations": 10}
"#;

    fn setup_experiment(root: &Path, exp: &str, conf: &str, samples: &[&str]) {
        let dir = root.join(exp);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("conf.yml"), conf).unwrap();
        for s in samples {
            fs::write(dir.join(format!("{}.data", s)), SAMPLE_LINES).unwrap();
        }
    }

    fn settings(root: &Path) -> Settings {
        Settings {
            data_root: root.to_path_buf(),
            features: vec!["year".into(), "n_citations".into()],
            ..Default::default()
        }
    }

    /// Records every (query, batch size) the driver sends.
    struct Recording<'c> {
        calls: &'c RefCell<Vec<(String, usize)>>,
    }

    impl Scorer for Recording<'_> {
        fn score(&mut self, query: &str, records: &[Record]) -> Result<Vec<f64>> {
            self.calls.borrow_mut().push((query.to_string(), records.len()));
            additive(query, records)
        }
    }

    #[test]
    fn test_single_sample_without_alias() {
        let dir = TempDir::new().unwrap();
        setup_experiment(dir.path(), "exp1", "samples:\n  A:\n    - query: q1\n", &["A"]);

        let settings = settings(dir.path());
        let source = JsonlSampleSource::new(dir.path(), 0);
        let calls = RefCell::new(Vec::new());
        let mut scorer = Recording { calls: &calls };
        let mut driver = Driver::new(&settings, &mut scorer, &source);

        let summary = driver.run_experiment("exp1").unwrap();
        assert_eq!(summary.tasks_completed, 1);
        assert_eq!(summary.tasks_failed, 0);

        let output = Location::new("exp1", "A");
        let store = driver.store();
        assert!(store.matrix_path(&output).exists());
        assert!(store.pdp_path(&output, "year").exists());
        assert!(store.diagonal_path(&output, "year", "n_citations").exists());

        assert!(calls.borrow().iter().all(|(q, _)| q == "q1"));
        // 3 + 3 PDP calls of 3 records, one diagonal call of 9.
        assert_eq!(calls.borrow().len(), 7);
    }

    #[test]
    fn test_alias_reads_other_experiment_data() {
        let dir = TempDir::new().unwrap();
        setup_experiment(dir.path(), "exp1", "samples: {}\n", &["cslg-rand-1000"]);
        setup_experiment(
            dir.path(),
            "exp2",
            "samples:\n  cslg:\n    - query: q1\nsample_from_other_exp:\n  cslg: [exp1, cslg-rand-1000.data]\n",
            &[],
        );

        let settings = settings(dir.path());
        let source = JsonlSampleSource::new(dir.path(), 0);
        let mut scorer = additive;
        let mut driver = Driver::new(&settings, &mut scorer, &source);

        // Seed a reusable PDP in the data's home experiment.
        let home = Location::new("exp1", "cslg-rand-1000");
        driver
            .store()
            .save_vector(&driver.store().pdp_path(&home, "year"), &[2005.0, 2015.0, 2025.0])
            .unwrap();

        let summary = driver.run_experiment("exp2").unwrap();
        assert_eq!(summary.tasks_completed, 1);

        let output = Location::new("exp2", "cslg");
        let store = driver.store();
        assert!(store.matrix_path(&output).exists());
        assert!(!store.pdp_path(&output, "year").exists());
        assert!(store.pdp_path(&output, "n_citations").exists());
    }

    #[test]
    fn test_missing_task_list_and_missing_data_are_isolated() {
        let dir = TempDir::new().unwrap();
        setup_experiment(
            dir.path(),
            "exp1",
            "samples:\n  empty:\n  gone:\n    - query: q1\n    - query: q2\n  A:\n    - query: q1\n",
            &["A"],
        );

        let settings = settings(dir.path());
        let source = JsonlSampleSource::new(dir.path(), 0);
        let mut scorer = additive;
        let mut driver = Driver::new(&settings, &mut scorer, &source);

        let summary = driver.run_experiment("exp1").unwrap();
        assert_eq!(summary.samples_skipped, 1);
        assert_eq!(summary.tasks_failed, 2);
        assert_eq!(summary.tasks_completed, 1);
    }

    #[test]
    fn test_degenerate_task_does_not_stop_siblings() {
        let dir = TempDir::new().unwrap();
        setup_experiment(
            dir.path(),
            "exp1",
            "samples:\n  A:\n    - query: q1\n  B:\n    - query: q1\n",
            &["A", "B"],
        );

        let settings = settings(dir.path());
        let source = JsonlSampleSource::new(dir.path(), 0);
        let mut scorer = zero;
        let mut driver = Driver::new(&settings, &mut scorer, &source);

        let summary = driver.run_experiment("exp1").unwrap();
        assert_eq!(summary.tasks_failed, 2);
        assert_eq!(summary.tasks_completed, 0);
    }

    #[test]
    fn test_scoring_failure_aborts_experiment() {
        let dir = TempDir::new().unwrap();
        setup_experiment(dir.path(), "exp1", "samples:\n  A:\n    - query: q1\n", &["A"]);

        let settings = settings(dir.path());
        let source = JsonlSampleSource::new(dir.path(), 0);
        let mut scorer =
            |_q: &str, _rs: &[Record]| -> Result<Vec<f64>> { Err(HStatError::Scoring("down".into())) };
        let mut driver = Driver::new(&settings, &mut scorer, &source);

        assert!(matches!(
            driver.run_experiment("exp1"),
            Err(HStatError::Scoring(_))
        ));
    }

    #[test]
    fn test_missing_experiment_dir() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path());
        let source = JsonlSampleSource::new(dir.path(), 0);
        let mut scorer = additive;
        let mut driver = Driver::new(&settings, &mut scorer, &source);

        assert!(matches!(
            driver.run_experiment("nope"),
            Err(HStatError::ExperimentNotFound(_))
        ));
    }
}
