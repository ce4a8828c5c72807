//! Configuration loading: run-level settings and per-experiment config.
//!
//! Two layers:
//! - `hstat.toml` (optional) holds run-level settings that apply to every
//!   experiment processed in one invocation: data root, feature list,
//!   scorer command, cache lookup policy.
//! - `<data_root>/<experiment>/conf.yml` describes one experiment: its
//!   samples, the scoring tasks per sample, and which samples borrow their
//!   data from another experiment.
//!
//! ## Example
//!
//! ```toml
//! data-root = "./pipelining"
//! features = ["title", "abstract", "venue", "authors", "year", "n_citations"]
//! line-limit = 1000
//! cache-lookup = "own-path"
//! centering = "mean"
//!
//! [scorer]
//! command = "python"
//! args = ["score_server.py"]
//! batch-size = 5000
//! ```
//!
//! ```yaml
//! description: venue ablation
//! samples:
//!   cslg:
//!     - query: "machine learning"
//! sample_from_other_exp:
//!   cslg: [exp1, cslg-rand-1000.data]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cache::CacheLookup;
use crate::error::{HStatError, Result};
use crate::interaction::Centering;
use crate::types::default_features;

/// Settings file name searched for in the working directory.
pub const SETTINGS_FILE: &str = "hstat.toml";

/// Per-experiment config file name.
pub const EXPERIMENT_CONFIG_FILE: &str = "conf.yml";

/// Default root holding one directory per experiment.
pub const DEFAULT_DATA_ROOT: &str = "./pipelining";

/// Default cap on records loaded per sample.
pub const DEFAULT_LINE_LIMIT: usize = 1000;

/// Default number of records sent to the scorer per request.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Run-level settings threaded through the driver.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Source file for these settings (for display).
    pub source: Option<PathBuf>,

    /// Directory containing one subdirectory per experiment.
    pub data_root: PathBuf,

    /// Feature list; pair enumeration and matrix indices follow this order.
    pub features: Vec<String>,

    /// Maximum records loaded per sample. 0 means unlimited.
    pub line_limit: usize,

    /// How a local single-PDP cache hit is loaded.
    pub cache_lookup: CacheLookup,

    /// Whether PDPs are mean-centred before computing H.
    pub centering: Centering,

    /// External scoring process.
    pub scorer: ScorerSettings,
}

/// External scorer invocation.
#[derive(Debug, Clone)]
pub struct ScorerSettings {
    pub command: Option<String>,
    pub args: Vec<String>,
    pub batch_size: usize,
}

impl Default for ScorerSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: None,
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            features: default_features(),
            line_limit: DEFAULT_LINE_LIMIT,
            cache_lookup: CacheLookup::default(),
            centering: Centering::default(),
            scorer: ScorerSettings::default(),
        }
    }
}

/// Raw settings as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawSettings {
    data_root: Option<String>,
    features: Option<Vec<String>>,
    line_limit: Option<usize>,
    cache_lookup: Option<CacheLookup>,
    centering: Option<Centering>,
    scorer: Option<RawScorer>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
struct RawScorer {
    command: Option<String>,
    args: Option<Vec<String>>,
    batch_size: Option<usize>,
}

impl Settings {
    /// Load `hstat.toml` from `directory`, or defaults if it is absent.
    pub fn load(directory: &Path) -> Result<Self> {
        let path = directory.join(SETTINGS_FILE);
        if path.exists() {
            Self::load_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from an explicit file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HStatError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let raw: RawSettings = toml::from_str(&content).map_err(|e| HStatError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::from_raw(raw, path.to_path_buf()))
    }

    fn from_raw(raw: RawSettings, source: PathBuf) -> Self {
        let defaults = Self::default();
        let scorer = raw.scorer.unwrap_or_default();
        Self {
            source: Some(source),
            data_root: raw.data_root.map(PathBuf::from).unwrap_or(defaults.data_root),
            features: raw.features.unwrap_or(defaults.features),
            line_limit: raw.line_limit.unwrap_or(defaults.line_limit),
            cache_lookup: raw.cache_lookup.unwrap_or(defaults.cache_lookup),
            centering: raw.centering.unwrap_or(defaults.centering),
            scorer: ScorerSettings {
                command: scorer.command,
                args: scorer.args.unwrap_or_default(),
                batch_size: scorer.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            },
        }
    }

    /// Directory of one experiment.
    pub fn experiment_dir(&self, experiment: &str) -> PathBuf {
        self.data_root.join(experiment)
    }

    /// Format settings for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        match self.source {
            Some(ref source) => lines.push(format!("   Settings: {}", source.display())),
            None => lines.push("   Settings: (defaults)".to_string()),
        }
        lines.push(format!("   Data root: {}", self.data_root.display()));
        lines.push(format!("   Features: {}", self.features.join(", ")));
        lines.push(format!(
            "   Cache lookup: {:?}, centering: {:?}",
            self.cache_lookup, self.centering
        ));
        if let Some(ref cmd) = self.scorer.command {
            lines.push(format!("   Scorer: {} {}", cmd, self.scorer.args.join(" ")));
        }

        lines.join("\n")
    }
}

/// One scoring task attached to a sample.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TaskConfig {
    pub query: String,
}

/// Data borrowed from another experiment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleAlias {
    pub experiment: String,
    pub data_file: String,
}

/// A configured sample resolved to where its records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleTarget {
    /// Name used for output artifacts.
    pub sample: String,
    /// Experiment whose directory holds the data (and reusable PDPs).
    pub data_experiment: String,
    /// Data file stem within `data_experiment`.
    pub data_source: String,
}

/// Parsed `conf.yml`. Sample order follows the document.
#[derive(Debug, Clone, Default)]
pub struct ExperimentConfig {
    pub description: Option<String>,
    pub samples: Vec<(String, Option<Vec<TaskConfig>>)>,
    pub sample_from_other_exp: Vec<(String, SampleAlias)>,
}

/// Raw conf.yml. Mappings stay as `serde_yaml::Mapping` to keep key order.
#[derive(Debug, Deserialize, Default)]
struct RawExperimentConfig {
    description: Option<String>,
    samples: Option<serde_yaml::Mapping>,
    sample_from_other_exp: Option<serde_yaml::Mapping>,
}

impl ExperimentConfig {
    /// Load `<exp_dir>/conf.yml`.
    pub fn load(exp_dir: &Path) -> Result<Self> {
        let path = exp_dir.join(EXPERIMENT_CONFIG_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| HStatError::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| match e {
            HStatError::Yaml(e) => HStatError::Config {
                path,
                message: e.to_string(),
            },
            other => other,
        })
    }

    /// Parse conf.yml content.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: Option<RawExperimentConfig> = serde_yaml::from_str(content)?;
        let raw = raw.unwrap_or_default();

        let mut samples = Vec::new();
        for (key, value) in raw.samples.unwrap_or_default() {
            let tasks: Option<Vec<TaskConfig>> = serde_yaml::from_value(value)?;
            samples.push((mapping_key(key)?, tasks));
        }

        let mut sample_from_other_exp = Vec::new();
        for (key, value) in raw.sample_from_other_exp.unwrap_or_default() {
            let (experiment, data_file): (String, String) = serde_yaml::from_value(value)?;
            sample_from_other_exp.push((
                mapping_key(key)?,
                SampleAlias {
                    experiment,
                    data_file,
                },
            ));
        }

        Ok(Self {
            description: raw.description,
            samples,
            sample_from_other_exp,
        })
    }

    /// Alias entry for a sample, if it borrows data from another experiment.
    pub fn alias(&self, sample: &str) -> Option<&SampleAlias> {
        self.sample_from_other_exp
            .iter()
            .find(|(name, _)| name == sample)
            .map(|(_, alias)| alias)
    }

    /// Tasks configured for a sample. `None` when the sample has no task list.
    pub fn tasks(&self, sample: &str) -> Option<&[TaskConfig]> {
        self.samples
            .iter()
            .find(|(name, _)| name == sample)
            .and_then(|(_, tasks)| tasks.as_deref())
    }

    /// Resolve every configured sample to its data location.
    ///
    /// Aliased samples read `<alias experiment>/<data file without .data>`;
    /// all others read `<experiment>/<sample>`.
    pub fn targets(&self, experiment: &str) -> Vec<SampleTarget> {
        self.samples
            .iter()
            .map(|(sample, _)| match self.alias(sample) {
                Some(alias) => SampleTarget {
                    sample: sample.clone(),
                    data_experiment: alias.experiment.clone(),
                    data_source: alias
                        .data_file
                        .strip_suffix(".data")
                        .unwrap_or(&alias.data_file)
                        .to_string(),
                },
                None => SampleTarget {
                    sample: sample.clone(),
                    data_experiment: experiment.to_string(),
                    data_source: sample.clone(),
                },
            })
            .collect()
    }
}

fn mapping_key(key: serde_yaml::Value) -> Result<String> {
    match key {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(HStatError::Yaml(serde::de::Error::custom(format!(
            "sample names must be scalars, got {:?}",
            other
        )))),
    }
}
