//! H-statistic reduction and the pairwise result table.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{HStatError, Result};
use crate::types::{FeaturePair, PairStatistic};

/// Centred denominators this small relative to the raw diagonal energy are
/// rounding noise from centring a constant vector.
const DEGENERATE_RATIO: f64 = 1e-20;

/// Whether PDPs are mean-centred before the H-statistic is computed.
///
/// `Mean` follows Friedman's definition, so a purely additive model gives
/// H = 0. `None` applies the formula to raw PDPs, reproducing numbers from
/// earlier pipelines that skipped centring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Centering {
    None,
    #[default]
    Mean,
}

/// Subtract the mean from every element.
pub fn center(values: &Array1<f64>) -> Array1<f64> {
    match values.mean() {
        Some(m) => values - m,
        None => values.clone(),
    }
}

/// Interaction strength of one feature pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interaction {
    pub hs: f64,
    pub hs_sqrt: f64,
}

/// Friedman's H-statistic for `(f1, f2)`.
///
/// All three vectors must have the sample's length. Fails with
/// [`HStatError::DegenerateInteraction`] when the (centred) diagonal PDP
/// has no energy.
pub fn h_statistic(
    f1: &str,
    f2: &str,
    f1_pdp: &[f64],
    f2_pdp: &[f64],
    diagonal: &[f64],
    centering: Centering,
) -> Result<Interaction> {
    let raw_diag = Array1::from(diagonal.to_vec());
    let raw_energy = raw_diag.mapv(|x| x * x).sum();

    let (a, b, d) = match centering {
        Centering::None => (
            Array1::from(f1_pdp.to_vec()),
            Array1::from(f2_pdp.to_vec()),
            raw_diag,
        ),
        Centering::Mean => (
            center(&Array1::from(f1_pdp.to_vec())),
            center(&Array1::from(f2_pdp.to_vec())),
            center(&raw_diag),
        ),
    };

    let residual = &d - &a - &b;
    let numerator = residual.mapv(|x| x * x).sum();
    let denominator = d.mapv(|x| x * x).sum();

    if denominator == 0.0 || denominator <= DEGENERATE_RATIO * raw_energy {
        return Err(HStatError::DegenerateInteraction {
            f1: f1.to_string(),
            f2: f2.to_string(),
        });
    }

    Ok(Interaction {
        hs: numerator / denominator,
        hs_sqrt: numerator.sqrt(),
    })
}

/// Pairwise H-statistics: a row per pair plus two symmetric matrices
/// indexed by feature order.
///
/// Pairs whose H is undefined get no row; their matrix cells stay 0 and
/// they are listed in `degenerate`.
#[derive(Debug, Clone)]
pub struct HStatTable {
    pub features: Vec<String>,
    /// Rows in pair-enumeration order
    pub rows: Vec<PairStatistic>,
    pub hs: Array2<f64>,
    pub hs_sqrt: Array2<f64>,
    /// Pairs skipped with a degenerate diagonal, in enumeration order
    pub degenerate: Vec<FeaturePair>,
}

impl HStatTable {
    pub fn new(features: Vec<String>) -> Self {
        let n = features.len();
        Self {
            features,
            rows: Vec::new(),
            hs: Array2::zeros((n, n)),
            hs_sqrt: Array2::zeros((n, n)),
            degenerate: Vec::new(),
        }
    }

    /// Mark a pair as undefined.
    pub fn skip(&mut self, pair: FeaturePair) {
        self.degenerate.push(pair);
    }

    /// `(f1, f2)` names of the degenerate pairs.
    pub fn degenerate_names(&self) -> Vec<(&str, &str)> {
        self.degenerate
            .iter()
            .map(|p| (self.features[p.i].as_str(), self.features[p.j].as_str()))
            .collect()
    }

    /// Record a pair, mirrored across the diagonal.
    pub fn insert(&mut self, pair: FeaturePair, interaction: Interaction) {
        let FeaturePair { i, j } = pair;
        self.hs[[i, j]] = interaction.hs;
        self.hs[[j, i]] = interaction.hs;
        self.hs_sqrt[[i, j]] = interaction.hs_sqrt;
        self.hs_sqrt[[j, i]] = interaction.hs_sqrt;

        self.rows.push(PairStatistic {
            f1: self.features[i].clone(),
            f2: self.features[j].clone(),
            hs: interaction.hs,
            hs_sqrt: interaction.hs_sqrt,
        });
    }

    /// Rows sorted by H-statistic, strongest first. Ties keep pair order.
    pub fn ranked(&self) -> Vec<&PairStatistic> {
        let mut sorted: Vec<_> = self.rows.iter().collect();
        sorted.sort_by(|a, b| b.hs.partial_cmp(&a.hs).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }
}
