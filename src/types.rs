//! Core types for hstat.
//!
//! Records are kept as plain JSON objects: the scoring backend consumes
//! them as-is, and feature substitution only ever replaces whole values.
//! Records are never mutated in place; substitution always produces a
//! fresh copy so the estimators stay referentially transparent.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One sampled item: feature name -> value.
pub type Record = serde_json::Map<String, Value>;

/// Features scored by the paper ranker, in the fixed order used for every
/// pair enumeration and matrix index.
pub const DEFAULT_FEATURES: &[&str] = &[
    "title",
    "abstract",
    "venue",
    "authors",
    "year",
    "n_citations",
];

/// Owned copy of [`DEFAULT_FEATURES`].
pub fn default_features() -> Vec<String> {
    DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect()
}

/// Value of `feature` in `record`, `null` when the record lacks it.
pub fn feature_value(record: &Record, feature: &str) -> Value {
    record.get(feature).cloned().unwrap_or(Value::Null)
}

/// Copy of `record` with each `(feature, value)` overwritten.
pub fn substitute(record: &Record, values: &[(&str, &Value)]) -> Record {
    let mut variant = record.clone();
    for (feature, value) in values {
        variant.insert((*feature).to_string(), (*value).clone());
    }
    variant
}

/// Unordered feature pair addressed by position in the feature list.
/// Always constructed with `i < j`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeaturePair {
    pub i: usize,
    pub j: usize,
}

impl FeaturePair {
    /// Every pair `(i, j)` with `i < j` over `n` features, row-major.
    pub fn all(n: usize) -> Vec<FeaturePair> {
        (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| FeaturePair { i, j }))
            .collect()
    }
}

/// One row of the ranked H-statistic table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairStatistic {
    pub f1: String,
    pub f2: String,
    /// Friedman's H-statistic: interaction residual energy / joint energy
    pub hs: f64,
    /// Square root of the unnormalised residual energy
    pub hs_sqrt: f64,
}
