//! Horizontal and vertical interpolation of the unified grid.

use crate::constants::{
    GEOPOTENTIAL, HEIGHT_DIM, LATITUDE_DIM, LONGITUDE_DIM, PRESSURE_DIM, STANDARD_GRAVITY,
    TIME_DIM,
};
use crate::edit::error::EditError;
use crate::grid::dataset::{Dataset, Values, Variable};
use crate::types::lat_lon::LatLon;
use log::{debug, warn};
use ndarray::{Array2, ArrayD, Axis, IxDyn};
use ordered_float::OrderedFloat;

const COORD_TOLERANCE: f64 = 1e-9;

/// Linear interpolation (or extrapolation) through two points.
pub fn linear_interpolate(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    if (x1 - x0).abs() < f64::EPSILON {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Locates `target` on a monotonic coordinate axis.
///
/// Returns the indices of the enclosing pair and the weight of the second
/// one. An axis of length one only matches its own coordinate. Targets
/// outside the axis give `None`.
pub fn bracket(coords: &[f64], target: f64) -> Option<(usize, usize, f64)> {
    match coords {
        [] => None,
        [only] => ((only - target).abs() <= COORD_TOLERANCE).then_some((0, 0, 0.0)),
        _ => coords.windows(2).enumerate().find_map(|(i, pair)| {
            let (a, b) = (pair[0], pair[1]);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            if target < lo - COORD_TOLERANCE || target > hi + COORD_TOLERANCE {
                return None;
            }
            if (b - a).abs() < f64::EPSILON {
                return Some((i, i, 0.0));
            }
            let weight = ((target - a) / (b - a)).clamp(0.0, 1.0);
            Some((i, i + 1, weight))
        }),
    }
}

/// Index/weight pairs of one axis, without zero-weight entries.
fn axis_weights((first, second, weight): (usize, usize, f64)) -> Vec<(usize, f64)> {
    if first == second || weight == 0.0 {
        vec![(first, 1.0)]
    } else if weight == 1.0 {
        vec![(second, 1.0)]
    } else {
        vec![(first, 1.0 - weight), (second, weight)]
    }
}

fn coordinate_values(ds: &Dataset, dim: &str, stage: &'static str) -> Result<Vec<f64>, EditError> {
    ds.index(dim)
        .and_then(|index| index.values.to_float())
        .map(|values| values.iter().copied().collect())
        .ok_or_else(|| EditError::MissingDimension {
            stage,
            dim: dim.to_string(),
        })
}

/// Bilinear interpolation of every horizontal field onto `target`.
///
/// The latitude and longitude dimensions disappear; scalar `latitude` and
/// `longitude` coordinates record the target. Points outside the grid give
/// `NaN`.
pub fn interpolate_point(ds: Dataset, target: LatLon) -> Result<Dataset, EditError> {
    const STAGE: &str = "interpolate_point";
    let latitudes = coordinate_values(&ds, LATITUDE_DIM, STAGE)?;
    let longitudes = coordinate_values(&ds, LONGITUDE_DIM, STAGE)?;

    let corners: Vec<(usize, usize, f64)> = match (
        bracket(&latitudes, target.0),
        bracket(&longitudes, target.1),
    ) {
        (Some(lat), Some(lon)) => {
            let lon_weights = axis_weights(lon);
            axis_weights(lat)
                .into_iter()
                .flat_map(|(i, wi)| lon_weights.iter().map(move |(j, wj)| (i, *j, wi * wj)))
                .collect()
        }
        _ => {
            warn!("{} lies outside the grid, values will be missing", target);
            Vec::new()
        }
    };
    debug!("Interpolating to {} from {} grid points", target, corners.len());

    let mut result = Dataset::new();
    result.attrs = ds.attrs.clone();
    for (name, variable) in ds.coords().chain(ds.data_vars()) {
        if name == LATITUDE_DIM || name == LONGITUDE_DIM {
            continue;
        }
        let (Some(lat_axis), Some(lon_axis)) =
            (variable.axis_of(LATITUDE_DIM), variable.axis_of(LONGITUDE_DIM))
        else {
            insert_like(&mut result, &ds, name, variable.clone())?;
            continue;
        };
        let Some(values) = variable.values.to_float() else {
            debug!("Dropping text variable '{}' laid out on the grid", name);
            continue;
        };

        let interpolated = weighted_sum(&values, lat_axis, lon_axis, &corners);
        let dims = variable
            .dims
            .iter()
            .filter(|d| *d != LATITUDE_DIM && *d != LONGITUDE_DIM)
            .cloned()
            .collect();
        let reduced = Variable {
            dims,
            values: Values::Float(interpolated),
            attrs: variable.attrs.clone(),
        };
        insert_like(&mut result, &ds, name, reduced)?;
    }

    result.insert_coord(
        LATITUDE_DIM,
        Variable::scalar(target.0).with_attr("units", "degrees_north"),
    )?;
    result.insert_coord(
        LONGITUDE_DIM,
        Variable::scalar(target.1).with_attr("units", "degrees_east"),
    )?;
    Ok(result)
}

fn weighted_sum(
    values: &ArrayD<f64>,
    lat_axis: usize,
    lon_axis: usize,
    corners: &[(usize, usize, f64)],
) -> ArrayD<f64> {
    // remove the later axis first so the earlier index stays valid
    let pick = |i: usize, j: usize| {
        if lat_axis > lon_axis {
            values
                .index_axis(Axis(lat_axis), i)
                .index_axis(Axis(lon_axis), j)
                .to_owned()
        } else {
            values
                .index_axis(Axis(lon_axis), j)
                .index_axis(Axis(lat_axis), i)
                .to_owned()
        }
    };

    let mut total: Option<ArrayD<f64>> = None;
    for &(i, j, weight) in corners {
        let term = pick(i, j).mapv(|v| v * weight);
        total = Some(match total {
            Some(sum) => sum + term,
            None => term,
        });
    }
    total.unwrap_or_else(|| {
        let shape: Vec<usize> = values
            .shape()
            .iter()
            .enumerate()
            .filter(|(axis, _)| *axis != lat_axis && *axis != lon_axis)
            .map(|(_, len)| *len)
            .collect();
        ArrayD::from_elem(IxDyn(&shape), f64::NAN)
    })
}

/// Interpolates one vertical profile onto `targets`.
///
/// Levels with missing height or value are ignored. Inside the profile the
/// interpolation is linear; outside it the two nearest levels are
/// extrapolated linearly, and a single valid level is held constant.
pub fn interpolate_profile(heights: &[f64], values: &[f64], targets: &[f64]) -> Vec<f64> {
    let mut levels: Vec<(f64, f64)> = heights
        .iter()
        .zip(values)
        .filter(|(h, v)| h.is_finite() && !v.is_nan())
        .map(|(h, v)| (*h, *v))
        .collect();
    levels.sort_by_key(|(h, _)| OrderedFloat(*h));
    levels.dedup_by(|a, b| a.0 == b.0);

    match levels.as_slice() {
        [] => vec![f64::NAN; targets.len()],
        [(_, only)] => vec![*only; targets.len()],
        _ => targets
            .iter()
            .map(|&target| {
                let upper = levels
                    .partition_point(|(h, _)| *h < target)
                    .clamp(1, levels.len() - 1);
                let (h0, v0) = levels[upper - 1];
                let (h1, v1) = levels[upper];
                linear_interpolate(h0, v0, h1, v1, target)
            })
            .collect(),
    }
}

/// Moves every `(time, pressure)` variable onto the fixed target heights.
///
/// Level heights come from the geopotential (`z / g`) of the same time step.
pub fn interpolate_heights(ds: Dataset, targets: &[f64]) -> Result<Dataset, EditError> {
    const STAGE: &str = "interpolate_heights";
    let layout = [TIME_DIM, PRESSURE_DIM];

    let geopotential = ds
        .data_var(GEOPOTENTIAL)
        .ok_or_else(|| EditError::MissingVariable(GEOPOTENTIAL.to_string()))?;
    if !geopotential.has_dims(&layout) {
        return Err(EditError::UnexpectedLayout {
            variable: GEOPOTENTIAL.to_string(),
            expected: layout.to_vec(),
            found: geopotential.dims.clone(),
        });
    }
    let level_heights = geopotential
        .values
        .to_float()
        .ok_or_else(|| EditError::MissingVariable(GEOPOTENTIAL.to_string()))?
        .mapv(|z| z / STANDARD_GRAVITY);
    let time_steps = ds.dim_len(TIME_DIM).ok_or(EditError::MissingDimension {
        stage: STAGE,
        dim: TIME_DIM.to_string(),
    })?;

    let mut result = Dataset::new();
    result.attrs = ds.attrs.clone();
    for (name, variable) in ds.coords().chain(ds.data_vars()) {
        if name == PRESSURE_DIM {
            continue;
        }
        if variable.axis_of(PRESSURE_DIM).is_none() {
            insert_like(&mut result, &ds, name, variable.clone())?;
            continue;
        }
        let values = match variable.values.to_float() {
            Some(values) if variable.has_dims(&layout) => values,
            _ => {
                warn!(
                    "Dropping '{}': dimensions {:?} cannot be height-interpolated",
                    name, variable.dims
                );
                continue;
            }
        };

        let mut profiles = Array2::from_elem((time_steps, targets.len()), f64::NAN);
        for (step, mut row) in profiles.axis_iter_mut(Axis(0)).enumerate() {
            let heights: Vec<f64> = level_heights.index_axis(Axis(0), step).iter().copied().collect();
            let column: Vec<f64> = values.index_axis(Axis(0), step).iter().copied().collect();
            for (slot, value) in row
                .iter_mut()
                .zip(interpolate_profile(&heights, &column, targets))
            {
                *slot = value;
            }
        }

        let interpolated = Variable {
            dims: vec![TIME_DIM.to_string(), HEIGHT_DIM.to_string()],
            values: Values::Float(profiles.into_dyn()),
            attrs: variable.attrs.clone(),
        };
        insert_like(&mut result, &ds, name, interpolated)?;
    }

    result.insert_coord(
        HEIGHT_DIM,
        Variable::float_1d(HEIGHT_DIM, targets.to_vec()).with_attr("units", "m"),
    )?;
    Ok(result)
}

fn insert_like(
    target: &mut Dataset,
    source: &Dataset,
    name: &str,
    variable: Variable,
) -> Result<(), EditError> {
    if source.is_coord(name) {
        target.insert_coord(name, variable)?;
    } else {
        target.insert_data_var(name, variable)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_bracket_ascending_and_descending() {
        assert_eq!(bracket(&[0.0, 1.0, 2.0], 1.5), Some((1, 2, 0.5)));
        let (i, j, w) = bracket(&[-21.0, -22.0, -23.0], -22.25).unwrap();
        assert_eq!((i, j), (1, 2));
        assert_close(w, 0.25);
        assert_eq!(bracket(&[0.0, 1.0], 1.5), None);
        assert_eq!(bracket(&[], 0.0), None);
    }

    #[test]
    fn test_bracket_single_point_axis() {
        assert_eq!(bracket(&[-40.0], -40.0), Some((0, 0, 0.0)));
        assert_eq!(bracket(&[-40.0], -40.1), None);
    }

    #[test]
    fn test_interpolate_profile_inside_and_outside() {
        let heights = [100.0, 300.0, 200.0];
        let values = [10.0, 30.0, 20.0];
        let result = interpolate_profile(&heights, &values, &[50.0, 150.0, 300.0, 400.0]);
        assert_close(result[0], 5.0);
        assert_close(result[1], 15.0);
        assert_close(result[2], 30.0);
        assert_close(result[3], 40.0);
    }

    #[test]
    fn test_interpolate_profile_degenerate() {
        assert_eq!(interpolate_profile(&[100.0], &[7.0], &[50.0, 500.0]), vec![7.0, 7.0]);
        let empty = interpolate_profile(&[f64::NAN], &[7.0], &[50.0]);
        assert!(empty[0].is_nan());
        let skipped = interpolate_profile(&[100.0, 200.0, 300.0], &[1.0, f64::NAN, 3.0], &[200.0]);
        assert_close(skipped[0], 2.0);
    }

    fn grid_dataset() -> Dataset {
        let mut ds = Dataset::new();
        ds.insert_coord(TIME_DIM, Variable::int_1d(TIME_DIM, vec![0])).unwrap();
        ds.insert_coord(PRESSURE_DIM, Variable::float_1d(PRESSURE_DIM, vec![900.0, 1000.0]))
            .unwrap();
        ds.insert_coord(LATITUDE_DIM, Variable::float_1d(LATITUDE_DIM, vec![-22.0, -23.0]))
            .unwrap();
        ds.insert_coord(LONGITUDE_DIM, Variable::float_1d(LONGITUDE_DIM, vec![-41.0, -40.0]))
            .unwrap();
        // value = 10 * lat index + lon index + level offset
        let mut values = Vec::new();
        for level in 0..2 {
            for i in 0..2 {
                for j in 0..2 {
                    values.push(100.0 * level as f64 + 10.0 * i as f64 + j as f64);
                }
            }
        }
        ds.insert_data_var(
            "t",
            Variable::new(
                &[TIME_DIM, PRESSURE_DIM, LATITUDE_DIM, LONGITUDE_DIM],
                Values::Float(ArrayD::from_shape_vec(IxDyn(&[1, 2, 2, 2]), values).unwrap()),
            ),
        )
        .unwrap();
        ds
    }

    #[test]
    fn test_interpolate_point_bilinear() {
        let point = interpolate_point(grid_dataset(), LatLon(-22.5, -40.25)).unwrap();
        let t = point.data_var("t").unwrap();
        assert_eq!(t.dims, vec![TIME_DIM, PRESSURE_DIM]);
        let t = t.values.as_float().unwrap();
        assert_close(t[[0, 0]], 5.75);
        assert_close(t[[0, 1]], 105.75);

        let lat = point.coord(LATITUDE_DIM).unwrap().values.as_float().unwrap();
        assert_eq!(lat.ndim(), 0);
        assert_eq!(lat.iter().next(), Some(&-22.5));
    }

    #[test]
    fn test_interpolate_point_outside_grid_is_nan() {
        let point = interpolate_point(grid_dataset(), LatLon(-30.0, -40.25)).unwrap();
        let t = point.data_var("t").unwrap().values.as_float().unwrap();
        assert!(t.iter().all(|v| v.is_nan()));
        assert_eq!(t.shape(), &[1, 2]);
    }

    #[test]
    fn test_interpolate_heights_requires_geopotential() {
        let point = interpolate_point(grid_dataset(), LatLon(-22.5, -40.25)).unwrap();
        let err = interpolate_heights(point, &[130.0]).unwrap_err();
        assert!(matches!(err, EditError::MissingVariable(name) if name == "z"));
    }

    #[test]
    fn test_interpolate_heights_uses_geopotential_height() {
        let mut ds = Dataset::new();
        ds.insert_coord(TIME_DIM, Variable::int_1d(TIME_DIM, vec![0, 3600])).unwrap();
        ds.insert_coord(PRESSURE_DIM, Variable::float_1d(PRESSURE_DIM, vec![900.0, 1000.0]))
            .unwrap();
        let g = STANDARD_GRAVITY;
        let z = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1000.0 * g, 100.0 * g, 1000.0 * g, 100.0 * g])
            .unwrap();
        let t = ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![280.0, 289.0, 270.0, 279.0]).unwrap();
        ds.insert_data_var(GEOPOTENTIAL, Variable::new(&layout_dims(), Values::Float(z)))
            .unwrap();
        ds.insert_data_var("t", Variable::new(&layout_dims(), Values::Float(t)))
            .unwrap();

        let out = interpolate_heights(ds, &[100.0, 550.0]).unwrap();
        assert!(out.index(HEIGHT_DIM).is_some());
        assert!(out.coord(PRESSURE_DIM).is_none());
        let t = out.data_var("t").unwrap();
        assert_eq!(t.dims, vec![TIME_DIM, HEIGHT_DIM]);
        let t = t.values.as_float().unwrap();
        assert_close(t[[0, 0]], 289.0);
        assert_close(t[[0, 1]], 284.5);
        assert_close(t[[1, 1]], 274.5);
        let z = out.data_var(GEOPOTENTIAL).unwrap().values.as_float().unwrap();
        assert_close(z[[0, 1]] / g, 550.0);
    }

    fn layout_dims() -> [&'static str; 2] {
        [TIME_DIM, PRESSURE_DIM]
    }
}
