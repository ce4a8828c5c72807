//! Artifact store: deterministic paths and `.npz` read/write.
//!
//! Arrays are written under the names numpy's `savez_compressed` gives
//! positional and keyword arguments, so artifacts are interchangeable with
//! ones produced by Python tooling. Writes go to a temporary file that is
//! renamed into place, so a failed run never leaves a truncated artifact
//! behind.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, ArrayD, Ix2};
use ndarray_npy::{NpzReader, NpzWriter};
use tracing::info;

use crate::error::{HStatError, Result};
use crate::types::PairStatistic;

/// Array name of single and diagonal PDP vectors.
pub const PDP_KEY: &str = "arr_0";

/// Same key as [`PDP_KEY`]; diagonal artifacts share the container layout.
pub const DIAGONAL_KEY: &str = PDP_KEY;

const HS_KEY: &str = "hs_metrix";
const HS_SQRT_KEY: &str = "hs_sqrt_metrix";

/// Experiment + sample pair that addresses a set of artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub experiment: String,
    pub sample: String,
}

impl Location {
    pub fn new(experiment: impl Into<String>, sample: impl Into<String>) -> Self {
        Self {
            experiment: experiment.into(),
            sample: sample.into(),
        }
    }
}

/// Create `dir` (and parents) if missing. Idempotent.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Root of all experiment directories.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn scores_dir(&self, loc: &Location) -> PathBuf {
        self.root.join(&loc.experiment).join("scores")
    }

    pub fn pdp_path(&self, loc: &Location, feature: &str) -> PathBuf {
        self.scores_dir(loc)
            .join(format!("{}_pdp_{}.npz", loc.sample, feature))
    }

    pub fn diagonal_path(&self, loc: &Location, f1: &str, f2: &str) -> PathBuf {
        self.scores_dir(loc)
            .join(format!("{}_diagonal_pdp_{}_{}.npz", loc.sample, f1, f2))
    }

    pub fn matrix_path(&self, loc: &Location) -> PathBuf {
        self.scores_dir(loc)
            .join(format!("{}_hs_metrix.npz", loc.sample))
    }

    pub fn table_path(&self, loc: &Location) -> PathBuf {
        self.scores_dir(loc)
            .join(format!("{}_hs_table.json", loc.sample))
    }

    /// Persist a PDP (or diagonal PDP) vector as `arr_0`.
    pub fn save_vector(&self, path: &Path, values: &[f64]) -> Result<()> {
        let array = Array1::from(values.to_vec());
        write_npz(path, |npz| {
            npz.add_array(PDP_KEY, &array)?;
            Ok(())
        })
    }

    /// Load a single-feature PDP.
    ///
    /// A 1-D array is returned as-is. Higher-rank arrays hold repeated
    /// evaluations per record; each record's block is reduced to its mean so
    /// the result has the shape of a fresh computation.
    pub fn load_pdp(&self, path: &Path) -> Result<Vec<f64>> {
        let array = read_array(path, PDP_KEY)?;
        Ok(reduce_rows(&array))
    }

    /// Load a diagonal PDP vector as stored.
    pub fn load_vector(&self, path: &Path) -> Result<Vec<f64>> {
        let array = read_array(path, DIAGONAL_KEY)?;
        Ok(array.iter().copied().collect())
    }

    /// Persist both H-statistic matrices in one artifact.
    pub fn save_matrices(&self, path: &Path, hs: &Array2<f64>, hs_sqrt: &Array2<f64>) -> Result<()> {
        write_npz(path, |npz| {
            npz.add_array(HS_KEY, hs)?;
            npz.add_array(HS_SQRT_KEY, hs_sqrt)?;
            Ok(())
        })
    }

    /// Load `(hs, hs_sqrt)` matrices.
    pub fn load_matrices(&self, path: &Path) -> Result<(Array2<f64>, Array2<f64>)> {
        let hs = to_matrix(path, read_array(path, HS_KEY)?)?;
        let hs_sqrt = to_matrix(path, read_array(path, HS_SQRT_KEY)?)?;
        Ok((hs, hs_sqrt))
    }

    /// Persist the ranked pair table as JSON.
    pub fn save_table(&self, path: &Path, rows: &[&PairStatistic]) -> Result<()> {
        if let Some(dir) = path.parent() {
            ensure_dir(dir)?;
        }
        let json = serde_json::to_string_pretty(rows)?;
        fs::write(path, json)?;
        Ok(())
    }
}

fn write_npz<F>(path: &Path, add: F) -> Result<()>
where
    F: FnOnce(&mut NpzWriter<File>) -> Result<()>,
{
    if let Some(dir) = path.parent() {
        ensure_dir(dir)?;
    }
    info!(path = %path.display(), "save PDP data");

    let tmp = path.with_extension("npz.tmp");
    let mut npz = NpzWriter::new_compressed(File::create(&tmp)?);
    add(&mut npz)?;
    npz.finish()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_array(path: &Path, key: &str) -> Result<ArrayD<f64>> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => HStatError::ArtifactNotFound(path.to_path_buf()),
        _ => HStatError::Io(e),
    })?;
    let mut npz = NpzReader::new(file)?;

    // numpy stores entries as "<key>.npy"; accept either spelling.
    let name = npz
        .names()?
        .into_iter()
        .find(|n| n == key || n.strip_suffix(".npy") == Some(key))
        .ok_or_else(|| HStatError::ArtifactNotFound(path.join(key)))?;

    Ok(npz.by_name(&name)?)
}

fn reduce_rows(array: &ArrayD<f64>) -> Vec<f64> {
    match array.ndim() {
        0 | 1 => array.iter().copied().collect(),
        _ => array
            .outer_iter()
            .map(|row| row.mean().unwrap_or(0.0))
            .collect(),
    }
}

fn to_matrix(path: &Path, array: ArrayD<f64>) -> Result<Array2<f64>> {
    let shape = array.shape().to_vec();
    array
        .into_dimensionality::<Ix2>()
        .map_err(|_| HStatError::ArtifactShape {
            path: path.to_path_buf(),
            expected: 2,
            actual: shape.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_paths_are_deterministic() {
        let store = ArtifactStore::new("/data");
        let loc = Location::new("exp1", "cslg");

        assert_eq!(
            store.pdp_path(&loc, "year"),
            PathBuf::from("/data/exp1/scores/cslg_pdp_year.npz")
        );
        assert_eq!(
            store.diagonal_path(&loc, "year", "venue"),
            PathBuf::from("/data/exp1/scores/cslg_diagonal_pdp_year_venue.npz")
        );
        assert_eq!(
            store.matrix_path(&loc),
            PathBuf::from("/data/exp1/scores/cslg_hs_metrix.npz")
        );
    }

    #[test]
    fn test_vector_roundtrip_creates_dir() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let loc = Location::new("exp1", "cslg");
        let path = store.pdp_path(&loc, "year");

        let values = vec![0.125, -3.5, 1e-9];
        store.save_vector(&path, &values).unwrap();

        assert!(store.scores_dir(&loc).is_dir());
        assert!(!path.with_extension("npz.tmp").exists());
        assert_eq!(store.load_pdp(&path).unwrap(), values);
        assert_eq!(store.load_vector(&path).unwrap(), values);

        // Second write into the existing directory succeeds.
        store.save_vector(&path, &[1.0]).unwrap();
        assert_eq!(store.load_pdp(&path).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_repeated_evaluations_reduce_to_row_means() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scores").join("s_pdp_year.npz");
        write_npz(&path, |npz| {
            npz.add_array(PDP_KEY, &array![[1.0, 3.0], [2.0, 2.0], [0.0, 10.0]])?;
            Ok(())
        })
        .unwrap();

        let store = ArtifactStore::new(dir.path());
        assert_eq!(store.load_pdp(&path).unwrap(), vec![2.0, 2.0, 5.0]);
    }

    #[test]
    fn test_matrices_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let path = store.matrix_path(&Location::new("exp1", "cslg"));

        let hs = array![[0.0, 0.5], [0.5, 0.0]];
        let hs_sqrt = array![[0.0, 2.0], [2.0, 0.0]];
        store.save_matrices(&path, &hs, &hs_sqrt).unwrap();

        let (a, b) = store.load_matrices(&path).unwrap();
        assert_eq!(a, hs);
        assert_eq!(b, hs_sqrt);
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.load_pdp(&dir.path().join("nope.npz")).unwrap_err();
        assert!(matches!(err, HStatError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_ensure_dir_idempotent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("a").join("scores");
        ensure_dir(&target).unwrap();
        ensure_dir(&target).unwrap();
        assert!(target.is_dir());
    }
}
