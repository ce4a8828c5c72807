//! Cache resolver: load a PDP from disk if some run already paid for it,
//! otherwise compute it and persist it.
//!
//! Resolution order for a single-feature PDP:
//! 1. in-memory memo for the current task
//! 2. `<source experiment>/scores/<source sample>_pdp_<f>.npz`
//! 3. `<output experiment>/scores/<output sample>_pdp_<f>.npz`
//! 4. fresh computation, persisted under the output location
//!
//! A hit at (3) takes precedence over (2). Diagonal PDPs are only ever
//! looked up under the output location.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::store::{ArtifactStore, Location};
use crate::error::{HStatError, Result};
use crate::interaction::{compute_diagonal_pdp, compute_pdp};
use crate::scoring::Scorer;
use crate::types::Record;

/// How a local single-PDP cache hit is read.
///
/// `Legacy` reproduces older pipelines, which loaded a local hit from the
/// source path too. With an aliased sample whose source artifact is missing
/// that surfaces as [`HStatError::ArtifactNotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheLookup {
    #[default]
    OwnPath,
    Legacy,
}

/// Where a task writes its artifacts and where reusable PDPs may live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleScope {
    pub output: Location,
    pub source: Location,
}

impl SampleScope {
    /// Scope whose data source is the output location itself.
    pub fn local(output: Location) -> Self {
        Self {
            source: output.clone(),
            output,
        }
    }
}

/// Cache hit/miss counters for one resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverStats {
    pub memo_hits: usize,
    pub source_hits: usize,
    pub local_hits: usize,
    pub diagonal_hits: usize,
    pub computed: usize,
}

/// Supplies PDP vectors for one (sample, query) task.
pub struct PdpResolver<'a, S: Scorer + ?Sized> {
    store: &'a ArtifactStore,
    scorer: &'a mut S,
    lookup: CacheLookup,
    scope: SampleScope,
    query: &'a str,
    records: &'a [Record],
    memo: HashMap<String, Vec<f64>>,
    stats: ResolverStats,
}

impl<'a, S: Scorer + ?Sized> PdpResolver<'a, S> {
    pub fn new(
        store: &'a ArtifactStore,
        scorer: &'a mut S,
        lookup: CacheLookup,
        scope: SampleScope,
        query: &'a str,
        records: &'a [Record],
    ) -> Self {
        Self {
            store,
            scorer,
            lookup,
            scope,
            query,
            records,
            memo: HashMap::new(),
            stats: ResolverStats::default(),
        }
    }

    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    /// Single-feature PDP for `feature`.
    pub fn single_pdp(&mut self, feature: &str) -> Result<Vec<f64>> {
        if let Some(pdp) = self.memo.get(feature) {
            self.stats.memo_hits += 1;
            return Ok(pdp.clone());
        }

        let source_path = self.store.pdp_path(&self.scope.source, feature);
        let local_path = self.store.pdp_path(&self.scope.output, feature);

        // A local hit overrides a source hit. For a non-aliased sample both
        // paths are the same file and count as one local hit.
        let hit: Option<PathBuf> = if local_path.exists() {
            self.stats.local_hits += 1;
            Some(match self.lookup {
                CacheLookup::OwnPath => local_path.clone(),
                CacheLookup::Legacy => source_path.clone(),
            })
        } else if source_path.exists() {
            self.stats.source_hits += 1;
            Some(source_path.clone())
        } else {
            None
        };

        let pdp = match hit {
            Some(path) => {
                debug!(feature, path = %path.display(), "pdp cache hit");
                let pdp = self.store.load_pdp(&path)?;
                self.check_len(path, &pdp)?;
                pdp
            }
            None => {
                let pdp = compute_pdp(&mut *self.scorer, self.query, self.records, feature)?;
                self.stats.computed += 1;
                self.store.save_vector(&local_path, &pdp)?;
                pdp
            }
        };

        self.memo.insert(feature.to_string(), pdp.clone());
        Ok(pdp)
    }

    /// Diagonal PDP for `(f1, f2)`, scoped to the output location only.
    pub fn diagonal_pdp(&mut self, f1: &str, f2: &str) -> Result<Vec<f64>> {
        let path = self.store.diagonal_path(&self.scope.output, f1, f2);

        if path.exists() {
            debug!(f1, f2, path = %path.display(), "diagonal pdp cache hit");
            self.stats.diagonal_hits += 1;
            let pdp = self.store.load_vector(&path)?;
            self.check_len(path, &pdp)?;
            return Ok(pdp);
        }

        let pdp = compute_diagonal_pdp(&mut *self.scorer, self.query, self.records, f1, f2)?;
        self.stats.computed += 1;
        self.store.save_vector(&path, &pdp)?;
        Ok(pdp)
    }

    /// `(f1 PDP, f2 PDP, diagonal PDP)` for a pair.
    pub fn pair(&mut self, f1: &str, f2: &str) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>)> {
        let a = self.single_pdp(f1)?;
        let b = self.single_pdp(f2)?;
        let d = self.diagonal_pdp(f1, f2)?;
        Ok((a, b, d))
    }

    fn check_len(&self, path: PathBuf, pdp: &[f64]) -> Result<()> {
        if pdp.len() != self.records.len() {
            return Err(HStatError::ArtifactShape {
                path,
                expected: self.records.len(),
                actual: pdp.len(),
            });
        }
        Ok(())
    }

    /// Log the hit/miss counters.
    pub fn log_stats(&self) {
        let s = self.stats;
        info!(
            sample = %self.scope.output.sample,
            memo_hits = s.memo_hits,
            source_hits = s.source_hits,
            local_hits = s.local_hits,
            diagonal_hits = s.diagonal_hits,
            computed = s.computed,
            "pdp cache stats"
        );
    }
}
