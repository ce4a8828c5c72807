//! Persistent PDP cache backed by compressed `.npz` artifacts.
//!
//! PDPs are the expensive part of the pipeline (`n²` model evaluations per
//! feature), so every computed vector is persisted and reused by later
//! runs, including runs of other experiments that borrow the same sample.
//!
//! Layout:
//!
//! ```text
//! <data_root>/<experiment>/scores/
//!   <sample>_pdp_<feature>.npz              arr_0: f64[n] (or f64[n, k])
//!   <sample>_diagonal_pdp_<f1>_<f2>.npz     arr_0: f64[n]
//!   <sample>_hs_metrix.npz                  hs_metrix, hs_sqrt_metrix: f64[m, m]
//!   <sample>_hs_table.json                  ranked pair table
//! ```

mod resolver;
mod store;

pub use resolver::{CacheLookup, PdpResolver, ResolverStats, SampleScope};
pub use store::{ensure_dir, ArtifactStore, Location, DIAGONAL_KEY, PDP_KEY};
