use crate::config::DataLayout;
use crate::edit::error::EditError;
use crate::edit::stage::{apply_all, standard_stages};
use crate::grid::dataset::Dataset;
use crate::grid::netcdf_io::{open_dataset, save_dataset};
use crate::locations::platform::{nearest, Platform};
use crate::types::lat_lon::LatLon;
use log::info;
use std::path::PathBuf;

/// Produces the per-location datasets from the unified dataset.
pub struct Editor {
    layout: DataLayout,
}

impl Editor {
    pub fn new(layout: &DataLayout) -> Editor {
        Editor {
            layout: layout.clone(),
        }
    }

    pub fn load_unified(&self) -> Result<Dataset, EditError> {
        Ok(open_dataset(&self.layout.unified_path())?)
    }

    /// Runs the standard stages on a copy of `unified` for `target`.
    pub fn edit(unified: &Dataset, target: LatLon) -> Result<Dataset, EditError> {
        apply_all(unified.clone(), &standard_stages(target))
    }

    /// Edits and persists the dataset of one platform, overwriting any
    /// earlier result.
    pub fn edit_platform(
        &self,
        unified: &Dataset,
        platform: Platform,
    ) -> Result<PathBuf, EditError> {
        let edited = Self::edit(unified, platform.coords())?;
        let path = self.layout.platform_dataset_path(platform);
        save_dataset(&edited, &path)?;
        info!("Saved edited dataset for {} to {}", platform, path.display());
        Ok(path)
    }

    /// Edits one platform given its name or symbol.
    pub fn edit_location(&self, representation: &str) -> Result<PathBuf, EditError> {
        let platform = Platform::from_representation(representation)?;
        let unified = self.load_unified()?;
        self.edit_platform(&unified, platform)
    }

    /// Edits every known platform in table order, stopping at the first error.
    pub fn edit_all(&self) -> Result<Vec<PathBuf>, EditError> {
        let unified = self.load_unified()?;
        let total = Platform::ALL.len();
        let mut paths = Vec::with_capacity(total);
        for (i, platform) in Platform::ALL.into_iter().enumerate() {
            info!("Editing {} ({}/{})", platform, i + 1, total);
            paths.push(self.edit_platform(&unified, platform)?);
        }
        Ok(paths)
    }

    /// Edits an arbitrary point and stores it with the other points.
    pub fn edit_point(&self, point: LatLon) -> Result<(Dataset, PathBuf), EditError> {
        let (platform, distance_km) = nearest(point);
        info!(
            "Editing point {}; nearest platform is {} at {:.1} km",
            point, platform, distance_km
        );
        let unified = self.load_unified()?;
        let edited = Self::edit(&unified, point)?;
        let path = self.layout.other_point_path(point);
        save_dataset(&edited, &path)?;
        Ok((edited, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::columns::{HEIGHT, UTC_TIME};
    use crate::constants::{LATITUDE_DIM, LONGITUDE_DIM, PRESSURE_DIM, TIME_DIM};
    use crate::grid::dataset::{Values, Variable};
    use crate::locations::error::LocationError;
    use ndarray::{ArrayD, IxDyn};
    use tempfile::tempdir;

    fn unified() -> Dataset {
        let mut ds = Dataset::new();
        ds.insert_coord(
            TIME_DIM,
            Variable::int_1d(TIME_DIM, vec![1_590_969_600])
                .with_attr("units", "seconds since 1970-01-01"),
        )
        .unwrap();
        ds.insert_coord(PRESSURE_DIM, Variable::float_1d(PRESSURE_DIM, vec![900.0, 1000.0]))
            .unwrap();
        ds.insert_coord(LATITUDE_DIM, Variable::float_1d(LATITUDE_DIM, vec![-22.0, -23.0]))
            .unwrap();
        ds.insert_coord(LONGITUDE_DIM, Variable::float_1d(LONGITUDE_DIM, vec![-41.0, -40.0]))
            .unwrap();
        let dims = [TIME_DIM, PRESSURE_DIM, LATITUDE_DIM, LONGITUDE_DIM];
        let field = |upper: f64, lower: f64| {
            let values = ArrayD::from_shape_fn(IxDyn(&[1, 2, 2, 2]), |ix| {
                if ix[1] == 0 {
                    upper
                } else {
                    lower
                }
            });
            Variable::new(&dims, Values::Float(values))
        };
        ds.insert_data_var("t", field(285.0, 295.0)).unwrap();
        ds.insert_data_var("z", field(1000.0 * 9.80665, 100.0 * 9.80665))
            .unwrap();
        ds.insert_data_var("number", Variable::scalar(0.0)).unwrap();
        ds
    }

    #[test]
    fn test_edit_produces_height_profiles() {
        let edited = Editor::edit(&unified(), Platform::Namorado2.coords()).unwrap();
        assert!(edited.is_index_coord(UTC_TIME));
        assert!(edited.is_index_coord(HEIGHT));
        assert!(!edited.contains("number"));
        assert!(!edited.contains(PRESSURE_DIM));

        let t = edited.data_var("t_K").unwrap();
        assert_eq!(t.dims, vec![UTC_TIME, HEIGHT]);
        // 130 m lies 30/900 of the way from 100 m (295 K) to 1000 m (285 K)
        let t = t.values.as_float().unwrap();
        assert!((t[[0, 0]] - (295.0 - 10.0 * 30.0 / 900.0)).abs() < 1e-9);
    }

    #[test]
    fn test_edit_all_and_point() {
        let dir = tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        save_dataset(&unified(), &layout.unified_path()).unwrap();
        let editor = Editor::new(&layout);

        let paths = editor.edit_all().unwrap();
        assert_eq!(paths.len(), Platform::ALL.len());
        assert!(paths.iter().all(|path| path.exists()));
        assert_eq!(paths[0], layout.platform_dataset_path(Platform::Namorado2));

        let (edited, path) = editor.edit_point(LatLon(-22.5, -40.5)).unwrap();
        assert_eq!(path, layout.other_point_path(LatLon(-22.5, -40.5)));
        assert!(path.exists());
        assert!(edited.contains("vel_res"));
    }

    #[test]
    fn test_edit_without_unified_dataset() {
        let dir = tempdir().unwrap();
        let editor = Editor::new(&DataLayout::new(dir.path()));
        assert!(matches!(
            editor.edit_location("p1").unwrap_err(),
            EditError::Grid(_)
        ));
        assert!(matches!(
            editor.edit_location("p10").unwrap_err(),
            EditError::Location(LocationError::UnknownLocation { .. })
        ));
    }
}
