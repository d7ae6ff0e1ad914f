use crate::config::DataLayout;
use crate::constants::{PRESSURE_DIM, TIME_DIM};
use crate::grid::dataset::Dataset;
use crate::grid::error::GridError;
use crate::grid::netcdf_io::save_dataset;
use crate::unify::combine::{align_outer, concat, merge};
use crate::unify::corpus::{index, Corpus, IndexReport};
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Builds the unified dataset from the raw grid files.
pub struct Unifier {
    raw_dir: PathBuf,
    unified_path: PathBuf,
}

impl Unifier {
    pub fn new(layout: &DataLayout) -> Unifier {
        Unifier {
            raw_dir: layout.raw_dir(),
            unified_path: layout.unified_path(),
        }
    }

    pub fn unified_path(&self) -> &Path {
        &self.unified_path
    }

    /// Indexes the raw directory, logging every skipped entry.
    pub fn index(&self) -> Result<IndexReport, GridError> {
        let report = index(&self.raw_dir)?;
        for (path, reason) in report.skipped() {
            warn!("Ignoring {}: {}", path.display(), reason);
        }
        if report.is_empty() {
            return Err(GridError::NoGridFiles(self.raw_dir.clone()));
        }
        info!(
            "Indexed {} grid files for {} variables",
            report.indexed_count(),
            report.corpus.len()
        );
        Ok(report)
    }

    /// index, concatenate, merge, then persist over the previous unified file.
    pub fn unify(&self) -> Result<Dataset, GridError> {
        let report = self.index()?;
        let per_variable = concatenate_years_and_levels(report.corpus)?;
        let unified = merge_variables(per_variable)?;
        info!(
            "Unified dataset holds {} variables over {} pressure levels",
            unified.data_var_names().len(),
            unified.dim_len(PRESSURE_DIM).unwrap_or(0)
        );
        save_dataset(&unified, &self.unified_path)?;
        info!("Saved unified dataset to {}", self.unified_path.display());
        Ok(unified)
    }
}

/// Per variable: joins years along time for each pressure level, then joins
/// the levels (ascending) along the pressure axis.
pub fn concatenate_years_and_levels(corpus: Corpus) -> Result<BTreeMap<String, Dataset>, GridError> {
    let mut per_variable = BTreeMap::new();
    for (variable, levels) in corpus {
        let mut level_datasets = Vec::with_capacity(levels.len());
        for (level, years) in levels {
            info!(
                "Concatenating {} years of {} at {} hPa",
                years.len(),
                variable,
                level
            );
            let years: Vec<Dataset> = years.into_values().collect();
            level_datasets.push(concat(&years, TIME_DIM)?);
        }
        // levels may cover different years
        let level_datasets = align_outer(level_datasets, TIME_DIM)?;
        per_variable.insert(variable, concat(&level_datasets, PRESSURE_DIM)?);
    }
    Ok(per_variable)
}

/// Merges the per-variable datasets on outer-aligned time and pressure axes.
pub fn merge_variables(per_variable: BTreeMap<String, Dataset>) -> Result<Dataset, GridError> {
    info!("Merging {} variables", per_variable.len());
    merge(per_variable.into_values().collect(), &[TIME_DIM, PRESSURE_DIM])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::dataset::{Values, Variable};
    use crate::grid::filename::encode;
    use crate::grid::netcdf_io::{open_dataset, save_dataset};
    use ndarray::{ArrayD, IxDyn};
    use tempfile::tempdir;

    fn raw_grid(short: &str, times: Vec<i64>, fill: f64) -> Dataset {
        let n = times.len();
        let mut ds = Dataset::new();
        ds.insert_coord(TIME_DIM, Variable::int_1d(TIME_DIM, times)).unwrap();
        ds.insert_coord("latitude", Variable::float_1d("latitude", vec![-22.0]))
            .unwrap();
        ds.insert_coord("longitude", Variable::float_1d("longitude", vec![-40.0]))
            .unwrap();
        let values = ArrayD::from_shape_vec(IxDyn(&[n, 1, 1]), vec![fill; n]).unwrap();
        ds.insert_data_var(
            short,
            Variable::new(&[TIME_DIM, "latitude", "longitude"], Values::Float(values)),
        )
        .unwrap();
        ds
    }

    #[test]
    fn test_unify_without_grid_files_fails() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        std::fs::create_dir_all(layout.raw_dir()).unwrap();
        let err = Unifier::new(&layout).unify().unwrap_err();
        assert!(matches!(err, GridError::NoGridFiles(_)));
    }

    #[test]
    fn test_unify_orders_levels_and_fills_gaps() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let raw = layout.raw_dir();

        // written in descending level order on purpose
        for level in [1000, 950, 900] {
            save_dataset(
                &raw_grid("t", vec![0, 3600], f64::from(level)),
                &raw.join(encode("temperature", 2020, level)),
            )
            .unwrap();
        }
        // geopotential only has one level and a later extra time step
        save_dataset(
            &raw_grid("z", vec![0, 3600, 7200], 9000.0),
            &raw.join(encode("geopotential", 2020, 950)),
        )
        .unwrap();

        let unifier = Unifier::new(&layout);
        unifier.unify().unwrap();
        let unified = open_dataset(unifier.unified_path()).unwrap();

        let levels = unified.index(PRESSURE_DIM).unwrap().values.as_float().unwrap();
        assert_eq!(levels.as_slice().unwrap(), &[900.0, 950.0, 1000.0]);
        assert_eq!(unified.dim_len(TIME_DIM), Some(3));

        let t = unified.data_var("t").unwrap();
        assert_eq!(t.dims, vec![TIME_DIM, PRESSURE_DIM, "latitude", "longitude"]);
        let t = t.values.as_float().unwrap();
        assert_eq!(t[[0, 0, 0, 0]], 900.0);
        assert_eq!(t[[1, 2, 0, 0]], 1000.0);
        assert!(t[[2, 0, 0, 0]].is_nan());

        let z = unified.data_var("z").unwrap().values.as_float().unwrap();
        assert!(z[[0, 0, 0, 0]].is_nan());
        assert_eq!(z[[2, 1, 0, 0]], 9000.0);
    }

    /// A grid as delivered by the data store, with `expver(valid_time)` and
    /// a scalar `number`.
    fn delivered_grid(short: &str, times: Vec<i64>, fill: f64) -> Dataset {
        let expver = times.iter().map(|_| "0001".to_string()).collect();
        let mut ds = raw_grid(short, times, fill);
        ds.insert_coord("expver", Variable::text_1d(TIME_DIM, expver))
            .unwrap();
        ds.insert_coord("number", Variable::scalar(0.0)).unwrap();
        ds
    }

    #[test]
    fn test_unify_delivered_grids_with_uneven_time_coverage() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let raw = layout.raw_dir();

        save_dataset(
            &delivered_grid("t", vec![0, 3600], 290.0),
            &raw.join(encode("temperature", 2020, 900)),
        )
        .unwrap();
        save_dataset(
            &delivered_grid("t", vec![3600, 7200], 295.0),
            &raw.join(encode("temperature", 2020, 1000)),
        )
        .unwrap();
        save_dataset(
            &delivered_grid("z", vec![0, 3600, 7200], 9000.0),
            &raw.join(encode("geopotential", 2020, 900)),
        )
        .unwrap();

        let unified = Unifier::new(&layout).unify().unwrap();
        assert!(!unified.contains("expver"));
        assert!(!unified.contains("number"));
        assert_eq!(unified.dim_len(TIME_DIM), Some(3));

        let t = unified.data_var("t").unwrap().values.as_float().unwrap();
        assert_eq!(t[[0, 0, 0, 0]], 290.0);
        assert!(t[[0, 1, 0, 0]].is_nan());
        assert!(t[[2, 0, 0, 0]].is_nan());
        assert_eq!(t[[2, 1, 0, 0]], 295.0);

        let z = unified.data_var("z").unwrap().values.as_float().unwrap();
        assert_eq!(z[[2, 0, 0, 0]], 9000.0);
        assert!(z[[0, 1, 0, 0]].is_nan());
    }

    #[test]
    fn test_unify_duplicate_key_uses_last_file() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let raw = layout.raw_dir();

        // sorts before the canonical name and is therefore replaced by it
        save_dataset(
            &raw_grid("t", vec![0, 3600], 1.0),
            &raw.join("(var-temperature)_(ano-2020)_(pressao-0900).nc"),
        )
        .unwrap();
        save_dataset(
            &raw_grid("t", vec![0, 3600], 2.0),
            &raw.join(encode("temperature", 2020, 900)),
        )
        .unwrap();

        let unified = Unifier::new(&layout).unify().unwrap();
        let t = unified.data_var("t").unwrap().values.as_float().unwrap();
        assert!(t.iter().all(|value| *value == 2.0));
    }

    #[test]
    fn test_unify_rejects_overlapping_years() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        let raw = layout.raw_dir();

        save_dataset(
            &raw_grid("t", vec![0, 3600], 1.0),
            &raw.join(encode("temperature", 2020, 900)),
        )
        .unwrap();
        save_dataset(
            &raw_grid("t", vec![3600, 7200], 2.0),
            &raw.join(encode("temperature", 2021, 900)),
        )
        .unwrap();

        let err = Unifier::new(&layout).unify().unwrap_err();
        assert!(matches!(err, GridError::MergeMismatch { dim, .. } if dim == TIME_DIM));
    }
}
