//! hstat - feature-interaction strength for black-box ranking models
//!
//! Computes Friedman's H-statistic for every pair of record features from
//! one- and two-dimensional partial dependence, caching every PDP on disk
//! so repeated runs (and other experiments sampling the same data) reuse
//! prior model evaluations.
//!
//! # Architecture
//!
//! ```text
//! conf.yml → Driver → Aggregator → PdpResolver ─┬─ cached .npz (source / output)
//!                        │                      └─ Estimators → Scorer
//!                        ↓
//!              H-statistic matrix (.npz) + ranked table
//! ```
//!
//! Everything runs on one thread; the scorer is called with batches of
//! record variants so the `O(n²)` evaluations per PDP cost `n` (or one)
//! round-trips to the backend.

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod interaction;
pub mod logging;
pub mod report;
pub mod sample;
pub mod scoring;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-export core types
pub use aggregate::{compute_and_save, compute_hstatistics, AggregateOptions};
pub use cache::{ArtifactStore, CacheLookup, Location, PdpResolver, SampleScope};
pub use config::{ExperimentConfig, SampleTarget, Settings, TaskConfig};
pub use driver::{Driver, ExperimentSummary};
pub use error::{HStatError, Result};
pub use interaction::{Centering, HStatTable, Interaction};
pub use sample::{JsonlSampleSource, SampleSource};
pub use scoring::{CommandScorer, Scorer};
pub use types::{FeaturePair, PairStatistic, Record, DEFAULT_FEATURES};
