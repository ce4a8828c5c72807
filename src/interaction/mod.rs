//! Partial dependence and Friedman's H-statistic.
//!
//! ## Partial Dependence
//!
//! The PDP of feature `f` at the value taken from record `r` is the mean
//! model score over the whole sample after every record's `f` has been
//! overwritten with `r[f]`. One value per record, `n` scorer calls of `n`
//! records each.
//!
//! ## Diagonal PDP
//!
//! For a pair `(f1, f2)` both features are overwritten together from the
//! same source record. The joint estimate minus the two marginals is the
//! interaction residual.
//!
//! ## H-Statistic
//!
//! ```text
//! H²(f1, f2) = Σ (PD₁₂ - PD₁ - PD₂)² / Σ PD₁₂²
//! ```
//!
//! with the square-root variant `√Σ (PD₁₂ - PD₁ - PD₂)²` reported next to
//! it. Friedman defines the statistic on mean-centred PDPs; see
//! [`Centering`].

pub mod hstat;
pub mod pdp;

pub use hstat::{center, h_statistic, Centering, HStatTable, Interaction};
pub use pdp::{compute_diagonal_pdp, compute_pdp, mean};
