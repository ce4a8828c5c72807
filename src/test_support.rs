//! Shared fixtures for unit tests: the three-record paper sample and
//! synthetic scorers with known interaction structure.

use serde_json::json;

use crate::error::Result;
use crate::types::Record;

/// `year ∈ {2000, 2010, 2020}`, `n_citations ∈ {0, 5, 10}`.
pub fn scenario_records() -> Vec<Record> {
    [(2000, 0), (2010, 5), (2020, 10)]
        .iter()
        .map(|(year, n)| {
            json!({
                "title": "t",
                "abstract": "a",
                "venue": "v",
                "authors": ["x"],
                "year": year,
                "n_citations": n
            })
            .as_object()
            .cloned()
            .unwrap()
        })
        .collect()
}

fn num(r: &Record, f: &str) -> f64 {
    r.get(f).and_then(|v| v.as_f64()).unwrap_or(0.0)
}

/// `score = year + n_citations`: no interaction.
pub fn additive(_query: &str, records: &[Record]) -> Result<Vec<f64>> {
    Ok(records
        .iter()
        .map(|r| num(r, "year") + num(r, "n_citations"))
        .collect())
}

/// `score = year * n_citations`: pure interaction.
pub fn multiplicative(_query: &str, records: &[Record]) -> Result<Vec<f64>> {
    Ok(records
        .iter()
        .map(|r| num(r, "year") * num(r, "n_citations"))
        .collect())
}

/// `score = year`: every other feature is ignored.
pub fn year_only(_query: &str, records: &[Record]) -> Result<Vec<f64>> {
    Ok(records.iter().map(|r| num(r, "year")).collect())
}

/// `score = 0`: every PDP is identically zero.
pub fn zero(_query: &str, records: &[Record]) -> Result<Vec<f64>> {
    Ok(vec![0.0; records.len()])
}
