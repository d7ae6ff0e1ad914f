//! Concatenation, outer alignment and merging of [`Dataset`]s.

use crate::grid::dataset::{Dataset, Values, Variable};
use crate::grid::error::GridError;
use ordered_float::OrderedFloat;
use std::collections::{BTreeSet, HashMap};

fn mismatch(dim: &str, reason: impl Into<String>) -> GridError {
    GridError::MergeMismatch {
        dim: dim.to_string(),
        reason: reason.into(),
    }
}

/// Values equal element-wise, with `NaN` equal to `NaN`.
pub fn same_values(a: &Values, b: &Values) -> bool {
    match (a, b) {
        (Values::Float(a), Values::Float(b)) => {
            a.shape() == b.shape()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| x == y || (x.is_nan() && y.is_nan()))
        }
        _ => a == b,
    }
}

/// Concatenates datasets along the existing dimension `dim`.
///
/// Every dataset must hold the same variables. Variables laid out along `dim`
/// are joined in input order; all other variables (the horizontal
/// coordinates, for instance) must be identical across inputs.
pub fn concat(datasets: &[Dataset], dim: &str) -> Result<Dataset, GridError> {
    let Some(first) = datasets.first() else {
        return Err(mismatch(dim, "nothing to concatenate"));
    };
    if datasets.len() == 1 {
        return Ok(first.clone());
    }

    let names = variable_names(first);
    for other in &datasets[1..] {
        if variable_names(other) != names {
            return Err(mismatch(dim, "datasets hold different variables"));
        }
    }

    let mut result = Dataset::new();
    result.attrs = first.attrs.clone();

    for name in &names {
        let parts: Vec<&Variable> = datasets.iter().filter_map(|ds| ds.variable(name)).collect();
        let template = parts[0];

        let combined = match template.axis_of(dim) {
            Some(axis) => {
                if parts.iter().any(|p| p.dims != template.dims) {
                    return Err(mismatch(
                        dim,
                        format!("variable '{}' has differing dimensions", name),
                    ));
                }
                let values: Vec<&Values> = parts.iter().map(|p| &p.values).collect();
                let joined = Values::concatenate(axis, &values).map_err(|e| {
                    mismatch(dim, format!("variable '{}' cannot be joined: {}", name, e))
                })?;
                Variable {
                    dims: template.dims.clone(),
                    values: joined,
                    attrs: template.attrs.clone(),
                }
            }
            None => {
                if parts
                    .iter()
                    .any(|p| p.dims != template.dims || !same_values(&p.values, &template.values))
                {
                    return Err(mismatch(
                        dim,
                        format!("variable '{}' differs between datasets", name),
                    ));
                }
                template.clone()
            }
        };

        insert_like(&mut result, first, name, combined).map_err(|e| as_mismatch(e, dim))?;
    }
    Ok(result)
}

/// Reindexes every dataset onto the sorted union of their `dim` indexes.
///
/// Positions a dataset has no value for are filled with missing values.
/// Datasets whose index already equals the union are returned unchanged.
/// An index holding the same value twice (two overlapping year files, for
/// instance) is rejected instead of having one of its slices dropped.
pub fn align_outer(datasets: Vec<Dataset>, dim: &str) -> Result<Vec<Dataset>, GridError> {
    let with_dim = datasets.iter().filter(|ds| ds.dim_len(dim).is_some()).count();
    if with_dim == 0 {
        return Ok(datasets);
    }

    let mut indexes = Vec::with_capacity(datasets.len());
    for ds in &datasets {
        let keys = ds
            .index(dim)
            .and_then(|index| index.values.index_keys())
            .ok_or_else(|| mismatch(dim, "a dataset lacks a numeric index for this dimension"))?;
        if let Some(repeated) = first_repeated(&keys) {
            return Err(mismatch(
                dim,
                format!("index value {} occurs more than once", repeated),
            ));
        }
        indexes.push(keys);
    }

    let union: Vec<OrderedFloat<f64>> = indexes
        .iter()
        .flatten()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    datasets
        .into_iter()
        .zip(indexes)
        .map(|(ds, keys)| {
            if keys == union {
                Ok(ds)
            } else {
                reindex(&ds, dim, &keys, &union)
            }
        })
        .collect()
}

fn first_repeated(keys: &[OrderedFloat<f64>]) -> Option<f64> {
    let mut seen = BTreeSet::new();
    keys.iter()
        .find(|key| !seen.insert(**key))
        .map(|key| key.into_inner())
}

fn reindex(
    ds: &Dataset,
    dim: &str,
    keys: &[OrderedFloat<f64>],
    union: &[OrderedFloat<f64>],
) -> Result<Dataset, GridError> {
    let positions: HashMap<OrderedFloat<f64>, usize> =
        keys.iter().enumerate().map(|(i, k)| (*k, i)).collect();
    let mapping: Vec<Option<usize>> = union.iter().map(|k| positions.get(k).copied()).collect();

    let mut result = Dataset::new();
    result.attrs = ds.attrs.clone();
    for (name, variable) in ds.coords().chain(ds.data_vars()) {
        let reindexed = if name == dim {
            let index = &variable.values;
            let values = match index {
                Values::Int(_) => Values::Int(
                    ndarray::Array1::from_iter(union.iter().map(|k| k.into_inner() as i64))
                        .into_dyn(),
                ),
                _ => Values::Float(
                    ndarray::Array1::from_iter(union.iter().map(|k| k.into_inner())).into_dyn(),
                ),
            };
            Variable {
                dims: variable.dims.clone(),
                values,
                attrs: variable.attrs.clone(),
            }
        } else if let Some(axis) = variable.axis_of(dim) {
            Variable {
                dims: variable.dims.clone(),
                values: variable.values.reindex_axis(axis, &mapping),
                attrs: variable.attrs.clone(),
            }
        } else {
            variable.clone()
        };
        insert_like(&mut result, ds, name, reindexed)?;
    }
    Ok(result)
}

/// Merges datasets holding different variables into one.
///
/// Time and pressure indexes are outer-aligned first. Variables present in
/// several inputs (typically the horizontal coordinates) must agree.
pub fn merge(datasets: Vec<Dataset>, aligned_dims: &[&str]) -> Result<Dataset, GridError> {
    let mut datasets = datasets;
    for dim in aligned_dims {
        datasets = align_outer(datasets, dim)?;
    }

    let mut result = Dataset::new();
    for ds in &datasets {
        for (key, value) in &ds.attrs {
            result.attrs.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for (name, variable) in ds.coords().chain(ds.data_vars()) {
            if let Some(existing) = result.variable(name) {
                if existing.dims != variable.dims || !same_values(&existing.values, &variable.values)
                {
                    return Err(mismatch(name, "conflicting values between variables"));
                }
                continue;
            }
            insert_like(&mut result, ds, name, variable.clone())
                .map_err(|e| as_mismatch(e, name))?;
        }
    }
    Ok(result)
}

fn variable_names(ds: &Dataset) -> BTreeSet<String> {
    ds.coords()
        .chain(ds.data_vars())
        .map(|(name, _)| name.clone())
        .collect()
}

/// Inserts `variable` into `target` with the same role (coordinate or data)
/// it has in `source`.
fn insert_like(
    target: &mut Dataset,
    source: &Dataset,
    name: &str,
    variable: Variable,
) -> Result<(), GridError> {
    if source.is_coord(name) {
        target.insert_coord(name, variable)
    } else {
        target.insert_data_var(name, variable)
    }
}

fn as_mismatch(error: GridError, context: &str) -> GridError {
    match error {
        GridError::DimensionConflict {
            dim,
            existing,
            found,
            ..
        } => mismatch(
            &dim,
            format!("lengths {} and {} while combining '{}'", existing, found, context),
        ),
        other => other,
    }
}
