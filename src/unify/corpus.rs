use crate::constants::{short_name, PRESSURE_DIM, TIME_DIM, UNWANTED_VARIABLES};
use crate::grid::dataset::{Dataset, Variable};
use crate::grid::error::GridError;
use crate::grid::filename::{decode, GridFileKey};
use crate::grid::netcdf_io::open_dataset;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Raw grids grouped as `variable -> pressure level -> year -> dataset`.
///
/// Both inner levels are ordered maps, so iterating them visits pressure
/// levels and years in ascending order.
pub type Corpus = BTreeMap<String, BTreeMap<u32, BTreeMap<i32, Dataset>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file name does not follow the grid naming convention.
    NameMismatch,
    NotAFile,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NameMismatch => write!(f, "name does not follow the grid file convention"),
            SkipReason::NotAFile => write!(f, "not a regular file"),
        }
    }
}

/// What happened to one directory entry during indexing.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOutcome {
    Indexed { path: PathBuf, key: GridFileKey },
    Skipped { path: PathBuf, reason: SkipReason },
}

/// Result of indexing a directory: the corpus plus one annotation per entry.
#[derive(Debug, Default)]
pub struct IndexReport {
    pub corpus: Corpus,
    pub outcomes: Vec<IndexOutcome>,
}

impl IndexReport {
    pub fn indexed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, IndexOutcome::Indexed { .. }))
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&Path, &SkipReason)> {
        self.outcomes.iter().filter_map(|o| match o {
            IndexOutcome::Skipped { path, reason } => Some((path.as_path(), reason)),
            IndexOutcome::Indexed { .. } => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }
}

/// Discovers the grid files in `directory` and loads them into a [`Corpus`].
///
/// Entries are visited in file name order. When two files carry the same
/// triple, the one visited last wins.
pub fn index(directory: &Path) -> Result<IndexReport, GridError> {
    if !directory.exists() {
        return Err(GridError::NotFound(directory.to_path_buf()));
    }
    let read_error = |e| GridError::DirectoryRead(directory.to_path_buf(), e);
    let mut paths = std::fs::read_dir(directory)
        .map_err(read_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_error)?;
    paths.sort();

    let mut report = IndexReport::default();
    for path in paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(key) = decode(&name) else {
            debug!("Skipping {}: not a grid file", path.display());
            report.outcomes.push(IndexOutcome::Skipped {
                path,
                reason: SkipReason::NameMismatch,
            });
            continue;
        };
        if !path.is_file() {
            report.outcomes.push(IndexOutcome::Skipped {
                path,
                reason: SkipReason::NotAFile,
            });
            continue;
        }

        let dataset = without_bookkeeping(open_dataset(&path)?, &name);
        let dataset = with_pressure_dimension(dataset, key.pressure_level)?;
        match short_name(&key.variable) {
            Some(short) if !dataset.contains(short) => warn!(
                "{} was requested as '{}' but holds no '{}' variable",
                path.display(),
                key.variable,
                short
            ),
            _ => {}
        }

        info!("Indexed {} ({})", name, key);
        let replaced = report
            .corpus
            .entry(key.variable.clone())
            .or_default()
            .entry(key.pressure_level)
            .or_default()
            .insert(key.year, dataset);
        if replaced.is_some() {
            debug!("{} replaces an earlier file with the same key", name);
        }
        report.outcomes.push(IndexOutcome::Indexed { path, key });
    }
    Ok(report)
}

/// Drops the per-file bookkeeping variables (`expver`, `number`).
///
/// They differ between files and would conflict wherever the time axes of
/// two files do not line up.
fn without_bookkeeping(mut dataset: Dataset, name: &str) -> Dataset {
    for unwanted in UNWANTED_VARIABLES {
        if dataset.remove(unwanted).is_some() {
            debug!("Dropped '{}' from {}", unwanted, name);
        }
    }
    dataset
}

/// Gives every time-dependent data variable a length-one pressure axis when
/// the file was downloaded without one.
fn with_pressure_dimension(mut dataset: Dataset, level: u32) -> Result<Dataset, GridError> {
    if dataset.dim_len(PRESSURE_DIM).is_some() {
        return Ok(dataset);
    }
    debug!("Adding pressure dimension {} hPa", level);

    for name in dataset.data_var_names() {
        let Some(variable) = dataset.remove(&name) else {
            continue;
        };
        let Some(time_axis) = variable.axis_of(TIME_DIM) else {
            dataset.insert_data_var(&name, variable)?;
            continue;
        };
        let axis = time_axis + 1;
        let mut dims = variable.dims.clone();
        dims.insert(axis, PRESSURE_DIM.to_string());
        let expanded = Variable {
            dims,
            values: variable.values.insert_axis(axis),
            attrs: variable.attrs,
        };
        dataset.insert_data_var(&name, expanded)?;
    }

    // a scalar pressure coordinate is superseded by the new index
    dataset.remove(PRESSURE_DIM);
    dataset.insert_coord(
        PRESSURE_DIM,
        Variable::float_1d(PRESSURE_DIM, vec![f64::from(level)]).with_attr("units", "hPa"),
    )?;
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::dataset::Values;
    use crate::grid::filename::encode;
    use crate::grid::netcdf_io::save_dataset;
    use ndarray::{ArrayD, IxDyn};
    use tempfile::tempdir;

    fn grid_without_pressure(times: Vec<i64>) -> Dataset {
        let n = times.len();
        let mut ds = Dataset::new();
        ds.insert_coord(TIME_DIM, Variable::int_1d(TIME_DIM, times)).unwrap();
        ds.insert_coord("latitude", Variable::float_1d("latitude", vec![-22.0, -23.0]))
            .unwrap();
        ds.insert_coord("longitude", Variable::float_1d("longitude", vec![-41.0, -40.0]))
            .unwrap();
        let values = ArrayD::from_shape_vec(IxDyn(&[n, 2, 2]), vec![280.0; n * 4]).unwrap();
        ds.insert_data_var(
            "t",
            Variable::new(&[TIME_DIM, "latitude", "longitude"], Values::Float(values)),
        )
        .unwrap();
        ds
    }

    #[test]
    fn test_index_missing_directory() {
        let err = index(Path::new("/no/such/raw/dir")).unwrap_err();
        assert!(matches!(err, GridError::NotFound(_)));
    }

    #[test]
    fn test_index_groups_and_skips() {
        let dir = tempdir().unwrap();
        let ds = grid_without_pressure(vec![0, 3600]);
        for (year, level) in [(2021, 900), (2020, 900), (2020, 1000)] {
            save_dataset(&ds, &dir.path().join(encode("temperature", year, level))).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not a grid").unwrap();

        let report = index(dir.path()).unwrap();
        assert_eq!(report.indexed_count(), 3);
        let skipped: Vec<_> = report.skipped().collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].1, &SkipReason::NameMismatch);

        let levels = &report.corpus["temperature"];
        assert_eq!(levels.keys().copied().collect::<Vec<_>>(), vec![900, 1000]);
        assert_eq!(levels[&900].keys().copied().collect::<Vec<_>>(), vec![2020, 2021]);

        let loaded = &levels[&1000][&2020];
        let t = loaded.data_var("t").unwrap();
        assert_eq!(t.dims, vec![TIME_DIM, PRESSURE_DIM, "latitude", "longitude"]);
        assert_eq!(t.values.shape(), &[2, 1, 2, 2]);
        let pressure = loaded.index(PRESSURE_DIM).unwrap().values.as_float().unwrap();
        assert_eq!(pressure[[0]], 1000.0);
    }

    #[test]
    fn test_index_drops_bookkeeping_variables() {
        let dir = tempdir().unwrap();
        let mut ds = grid_without_pressure(vec![0, 3600]);
        ds.insert_coord(
            "expver",
            Variable::text_1d(TIME_DIM, vec!["0001".to_string(), "0005".to_string()]),
        )
        .unwrap();
        ds.insert_coord("number", Variable::scalar(0.0)).unwrap();
        save_dataset(&ds, &dir.path().join(encode("temperature", 2020, 900))).unwrap();

        let report = index(dir.path()).unwrap();
        let loaded = &report.corpus["temperature"][&900][&2020];
        assert!(!loaded.contains("expver"));
        assert!(!loaded.contains("number"));
        assert!(loaded.contains("t"));
    }

    #[test]
    fn test_index_duplicate_key_last_path_wins() {
        let dir = tempdir().unwrap();
        // both decode to (temperature, 2020, 900); the zero-padded name sorts first
        let padded = "(var-temperature)_(ano-2020)_(pressao-0900).nc";
        save_dataset(&grid_without_pressure(vec![0]), &dir.path().join(padded)).unwrap();
        save_dataset(
            &grid_without_pressure(vec![0, 3600, 7200]),
            &dir.path().join(encode("temperature", 2020, 900)),
        )
        .unwrap();

        let report = index(dir.path()).unwrap();
        assert_eq!(report.indexed_count(), 2);
        let kept = &report.corpus["temperature"][&900][&2020];
        assert_eq!(kept.dim_len(TIME_DIM), Some(3));
    }
}
