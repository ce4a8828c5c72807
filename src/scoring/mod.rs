//! Scoring backend seam.
//!
//! The ranking model is an external collaborator: hstat only needs "score
//! these records against this query, one number per record, in input
//! order". Anything satisfying [`Scorer`] can drive the estimators, which
//! keeps tests free of a real model (closures implement the trait).

mod command;

pub use command::CommandScorer;

use crate::error::Result;
use crate::types::Record;

/// Scores a batch of records against a query.
///
/// Implementations must return exactly one score per input record, in
/// input order. The estimators verify the count.
pub trait Scorer {
    fn score(&mut self, query: &str, records: &[Record]) -> Result<Vec<f64>>;
}

impl<F> Scorer for F
where
    F: FnMut(&str, &[Record]) -> Result<Vec<f64>>,
{
    fn score(&mut self, query: &str, records: &[Record]) -> Result<Vec<f64>> {
        self(query, records)
    }
}
