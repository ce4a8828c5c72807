//! H-statistic aggregation for one (sample, query) task.
//!
//! Walks every feature pair `i < j` in the fixed feature order, pulls the
//! three PDPs from the cache resolver, reduces them to H and √numerator,
//! then persists the matrices and the ranked table next to the PDP
//! artifacts. A pair whose diagonal carries no energy is skipped with a
//! warning; the task only fails when no pair is defined at all. Pairs are processed one after another; every cache lookup,
//! scorer call and write for a pair completes before the next pair starts.

use tracing::{info, warn};

use crate::cache::{ArtifactStore, CacheLookup, PdpResolver, SampleScope};
use crate::error::{HStatError, Result};
use crate::interaction::{h_statistic, Centering, HStatTable};
use crate::report;
use crate::scoring::Scorer;
use crate::types::{FeaturePair, Record};

/// Compute the pairwise table using `resolver` for every PDP.
///
/// Degenerate pairs are recorded in [`HStatTable::degenerate`]. When every
/// pair is degenerate the first [`HStatError::DegenerateInteraction`] is
/// returned instead of an empty table.
pub fn compute_hstatistics<S>(
    resolver: &mut PdpResolver<'_, S>,
    features: &[String],
    centering: Centering,
) -> Result<HStatTable>
where
    S: Scorer + ?Sized,
{
    let mut table = HStatTable::new(features.to_vec());
    let mut first_degenerate = None;

    for pair in FeaturePair::all(features.len()) {
        let f1 = &features[pair.i];
        let f2 = &features[pair.j];

        let (f1_pdp, f2_pdp, diagonal) = resolver.pair(f1, f2)?;
        match h_statistic(f1, f2, &f1_pdp, &f2_pdp, &diagonal, centering) {
            Ok(interaction) => table.insert(pair, interaction),
            Err(e @ HStatError::DegenerateInteraction { .. }) => {
                warn!(f1 = %f1, f2 = %f2, "degenerate pair skipped");
                table.skip(pair);
                first_degenerate.get_or_insert(e);
            }
            Err(e) => return Err(e),
        }
    }

    if table.rows.is_empty() {
        if let Some(e) = first_degenerate {
            return Err(e);
        }
    }
    if !table.degenerate.is_empty() {
        let names: Vec<String> = table
            .degenerate_names()
            .iter()
            .map(|(a, b)| format!("({}, {})", a, b))
            .collect();
        warn!(pairs = %names.join(" "), "h-statistic undefined for some pairs");
    }

    Ok(table)
}

/// Options for one aggregation run.
#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub lookup: CacheLookup,
    pub centering: Centering,
}

/// Compute, persist and print the H-statistic table for one task.
///
/// Writes `<sample>_hs_metrix.npz` (both matrices) and
/// `<sample>_hs_table.json` under the output location.
pub fn compute_and_save<S>(
    store: &ArtifactStore,
    scorer: &mut S,
    scope: SampleScope,
    query: &str,
    records: &[Record],
    features: &[String],
    options: AggregateOptions,
) -> Result<HStatTable>
where
    S: Scorer + ?Sized,
{
    info!(
        sample = %scope.output.sample,
        source = %format!("{}/{}", scope.source.experiment, scope.source.sample),
        query,
        records = records.len(),
        "computing h-statistics"
    );

    let output = scope.output.clone();
    let mut resolver = PdpResolver::new(store, scorer, options.lookup, scope, query, records);
    let table = compute_hstatistics(&mut resolver, features, options.centering)?;
    resolver.log_stats();

    store.save_matrices(&store.matrix_path(&output), &table.hs, &table.hs_sqrt)?;
    store.save_table(&store.table_path(&output), &table.ranked())?;

    report::print_table(&table, &output.sample, query);
    Ok(table)
}
