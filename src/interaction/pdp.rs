//! PDP and diagonal PDP estimators.
//!
//! Both are pure with respect to the sample: variants are fresh copies and
//! the only side effect is the scorer call. Persisting results is the
//! cache resolver's job.

use std::time::Instant;

use tracing::info;

use crate::error::{HStatError, Result};
use crate::scoring::Scorer;
use crate::types::{feature_value, substitute, Record};

/// Arithmetic mean. Empty input yields 0.0.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn check_count(expected: usize, scores: &[f64]) -> Result<()> {
    if scores.len() != expected {
        return Err(HStatError::ScoreCount {
            expected,
            actual: scores.len(),
        });
    }
    Ok(())
}

/// One-dimensional partial dependence of `feature`.
///
/// Entry `r` is the mean score of the sample with every record's `feature`
/// replaced by `records[r][feature]`.
pub fn compute_pdp<S>(
    scorer: &mut S,
    query: &str,
    records: &[Record],
    feature: &str,
) -> Result<Vec<f64>>
where
    S: Scorer + ?Sized,
{
    info!(feature, "getting pdp");
    let start = Instant::now();
    let n = records.len();
    let mut pdp = Vec::with_capacity(n);

    for source in records {
        let value = feature_value(source, feature);
        let variants: Vec<Record> = records
            .iter()
            .map(|target| substitute(target, &[(feature, &value)]))
            .collect();

        let scores = scorer.score(query, &variants)?;
        check_count(n, &scores)?;
        pdp.push(mean(&scores));
    }

    info!(
        feature,
        scores = n * n,
        secs = start.elapsed().as_secs_f64(),
        "computed pdp"
    );
    Ok(pdp)
}

/// Diagonal partial dependence of `(f1, f2)`.
///
/// Entry `r` is the mean score of the sample with both features of every
/// record replaced by the values of record `r`. All `n·n` variants are
/// scored in one call, laid out source-major.
pub fn compute_diagonal_pdp<S>(
    scorer: &mut S,
    query: &str,
    records: &[Record],
    f1: &str,
    f2: &str,
) -> Result<Vec<f64>>
where
    S: Scorer + ?Sized,
{
    info!(f1, f2, "getting diagonal pdp");
    let n = records.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let start = Instant::now();

    let mut variants = Vec::with_capacity(n * n);
    for source in records {
        let v1 = feature_value(source, f1);
        let v2 = feature_value(source, f2);
        variants.extend(
            records
                .iter()
                .map(|target| substitute(target, &[(f1, &v1), (f2, &v2)])),
        );
    }

    let scores = scorer.score(query, &variants)?;
    check_count(variants.len(), &scores)?;
    let pdp: Vec<f64> = scores.chunks(n).map(mean).collect();

    info!(
        f1,
        f2,
        scores = scores.len(),
        secs = start.elapsed().as_secs_f64(),
        "computed diagonal pdp"
    );
    Ok(pdp)
}
