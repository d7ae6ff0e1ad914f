//! Reading and writing [`Dataset`]s as NetCDF-4 files.
//!
//! Reading applies the usual CF decoding: `_FillValue` and `missing_value`
//! become `NaN`, `scale_factor`/`add_offset` are applied, and time axes are
//! converted to seconds since the Unix epoch. Writing goes through a
//! temporary sibling file that replaces the target only once complete.

use crate::grid::dataset::{AttrValue, Dataset, Values, Variable};
use crate::grid::error::GridError;
use crate::grid::time_axis::{is_time_units, TimeUnits, EPOCH_SECONDS_UNITS};
use log::debug;
use ndarray::{ArrayD, IxDyn};
use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const COORDINATES_ATTR: &str = "coordinates";
const PACKING_ATTRS: [&str; 4] = ["_FillValue", "missing_value", "scale_factor", "add_offset"];

fn nc_error(path: &Path) -> impl FnOnce(netcdf::Error) -> GridError + '_ {
    move |source| GridError::NetCdf {
        path: path.to_path_buf(),
        source,
    }
}

enum RawValues {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
}

macro_rules! read_widened {
    ($var:expr, $path:expr, $ty:ty, $convert:expr) => {{
        let raw: Vec<$ty> = $var.get_values(..).map_err(nc_error($path))?;
        raw.into_iter().map($convert).collect::<Vec<_>>()
    }};
}

/// Opens a NetCDF file into memory.
pub fn open_dataset(path: &Path) -> Result<Dataset, GridError> {
    if !path.exists() {
        return Err(GridError::NotFound(path.to_path_buf()));
    }
    let file = netcdf::open(path).map_err(nc_error(path))?;

    let mut dataset = Dataset::new();
    let mut coord_names = BTreeSet::new();
    for attr in file.attributes() {
        let name = attr.name().to_string();
        let Some(value) = attr.value().ok().and_then(to_attr_value) else {
            continue;
        };
        if name == COORDINATES_ATTR {
            collect_names(&value, &mut coord_names);
        } else {
            dataset.attrs.insert(name, value);
        }
    }

    let mut variables = Vec::new();
    for var in file.variables() {
        let name = var.name().to_string();
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let mut attrs = BTreeMap::new();
        for attr in var.attributes() {
            if let Some(value) = attr.value().ok().and_then(to_attr_value) {
                attrs.insert(attr.name().to_string(), value);
            }
        }
        if let Some(value) = attrs.remove(COORDINATES_ATTR) {
            collect_names(&value, &mut coord_names);
        }

        let raw = match var.vartype() {
            NcVariableType::Float(FloatType::F64) => {
                RawValues::Float(read_widened!(var, path, f64, |v| v))
            }
            NcVariableType::Float(FloatType::F32) => {
                RawValues::Float(read_widened!(var, path, f32, f64::from))
            }
            NcVariableType::Int(IntType::I64) => RawValues::Int(read_widened!(var, path, i64, |v| v)),
            NcVariableType::Int(IntType::I32) => {
                RawValues::Int(read_widened!(var, path, i32, i64::from))
            }
            NcVariableType::Int(IntType::I16) => {
                RawValues::Int(read_widened!(var, path, i16, i64::from))
            }
            NcVariableType::Int(IntType::I8) => RawValues::Int(read_widened!(var, path, i8, i64::from)),
            NcVariableType::Int(IntType::U64) => {
                RawValues::Int(read_widened!(var, path, u64, |v| v as i64))
            }
            NcVariableType::Int(IntType::U32) => {
                RawValues::Int(read_widened!(var, path, u32, i64::from))
            }
            NcVariableType::Int(IntType::U16) => {
                RawValues::Int(read_widened!(var, path, u16, i64::from))
            }
            NcVariableType::Int(IntType::U8) => RawValues::Int(read_widened!(var, path, u8, i64::from)),
            NcVariableType::String => {
                let count = shape.iter().product();
                let mut texts = Vec::with_capacity(count);
                for flat in 0..count {
                    let index = unravel(flat, &shape);
                    texts.push(var.get_string(index.as_slice()).map_err(nc_error(path))?);
                }
                RawValues::Text(texts)
            }
            other => {
                debug!("Skipping variable '{}' of unsupported type {:?}", name, other);
                continue;
            }
        };

        let values = decode_values(&name, raw, &shape, &mut attrs)?;
        variables.push((name, Variable { dims, values, attrs }));
    }

    for (name, variable) in variables {
        let is_index = variable.dims.len() == 1 && variable.dims[0] == name;
        if is_index || coord_names.contains(&name) {
            dataset.insert_coord(&name, variable)?;
        } else {
            dataset.insert_data_var(&name, variable)?;
        }
    }
    Ok(dataset)
}

fn decode_values(
    name: &str,
    raw: RawValues,
    shape: &[usize],
    attrs: &mut BTreeMap<String, AttrValue>,
) -> Result<Values, GridError> {
    let shaped = |len: usize| -> Result<IxDyn, GridError> {
        if shape.iter().product::<usize>() == len {
            Ok(IxDyn(shape))
        } else {
            Err(GridError::Shape {
                variable: name.to_string(),
                source: ndarray::ShapeError::from_kind(ndarray::ErrorKind::OutOfBounds),
            })
        }
    };
    let shape_error = |source| GridError::Shape {
        variable: name.to_string(),
        source,
    };

    let is_packed = PACKING_ATTRS.iter().any(|attr| attrs.contains_key(*attr));
    let floats: Vec<f64> = match raw {
        RawValues::Text(texts) => {
            let dim = shaped(texts.len())?;
            return ArrayD::from_shape_vec(dim, texts)
                .map(Values::Text)
                .map_err(shape_error);
        }
        RawValues::Int(ints) if !is_packed => {
            let dim = shaped(ints.len())?;
            let ints = ArrayD::from_shape_vec(dim, ints).map_err(shape_error)?;
            return Ok(decode_time(attrs, Values::Int(ints)));
        }
        RawValues::Int(ints) => ints.into_iter().map(|v| v as f64).collect(),
        RawValues::Float(floats) => floats,
    };

    let number = |attrs: &BTreeMap<String, AttrValue>, key: &str| match attrs.get(key) {
        Some(AttrValue::Number(value)) => Some(*value),
        _ => None,
    };
    let fill = number(attrs, "_FillValue");
    let missing = number(attrs, "missing_value");
    let scale = number(attrs, "scale_factor").unwrap_or(1.0);
    let offset = number(attrs, "add_offset").unwrap_or(0.0);
    for attr in PACKING_ATTRS {
        attrs.remove(attr);
    }

    let decoded: Vec<f64> = floats
        .into_iter()
        .map(|v| {
            if Some(v) == fill || Some(v) == missing {
                f64::NAN
            } else {
                v * scale + offset
            }
        })
        .collect();
    let dim = shaped(decoded.len())?;
    let floats = ArrayD::from_shape_vec(dim, decoded).map_err(shape_error)?;
    Ok(decode_time(attrs, Values::Float(floats)))
}

/// Converts a CF time axis into epoch seconds, leaving other variables alone.
fn decode_time(attrs: &mut BTreeMap<String, AttrValue>, values: Values) -> Values {
    let units = match attrs.get("units") {
        Some(AttrValue::Text(units)) if is_time_units(units) => units.clone(),
        _ => return values,
    };
    let Ok(time_units) = TimeUnits::parse(&units) else {
        debug!("Leaving time-like variable with units '{}' undecoded", units);
        return values;
    };
    let Some(offsets) = values.to_float() else {
        return values;
    };
    attrs.insert("units".to_string(), AttrValue::from(EPOCH_SECONDS_UNITS));
    attrs.remove("calendar");
    Values::Int(offsets.mapv(|v| time_units.to_epoch_seconds(v)))
}

fn to_attr_value(value: AttributeValue) -> Option<AttrValue> {
    let number = match value {
        AttributeValue::Str(text) => return Some(AttrValue::Text(text)),
        AttributeValue::Strs(texts) => return Some(AttrValue::Text(texts.join(" "))),
        AttributeValue::Double(v) => v,
        AttributeValue::Float(v) => f64::from(v),
        AttributeValue::Longlong(v) => v as f64,
        AttributeValue::Ulonglong(v) => v as f64,
        AttributeValue::Int(v) => f64::from(v),
        AttributeValue::Uint(v) => f64::from(v),
        AttributeValue::Short(v) => f64::from(v),
        AttributeValue::Ushort(v) => f64::from(v),
        AttributeValue::Schar(v) => f64::from(v),
        AttributeValue::Uchar(v) => f64::from(v),
        AttributeValue::Doubles(v) if v.len() == 1 => v[0],
        AttributeValue::Floats(v) if v.len() == 1 => f64::from(v[0]),
        _ => return None,
    };
    Some(AttrValue::Number(number))
}

fn collect_names(value: &AttrValue, names: &mut BTreeSet<String>) {
    if let AttrValue::Text(list) = value {
        names.extend(list.split_whitespace().map(str::to_string));
    }
}

/// Position of the `flat`-th element of a C-ordered array of `shape`.
fn unravel(mut flat: usize, shape: &[usize]) -> Vec<usize> {
    let mut index = vec![0; shape.len()];
    for (axis, len) in shape.iter().enumerate().rev() {
        if *len > 0 {
            index[axis] = flat % len;
            flat /= len;
        }
    }
    index
}

/// Writes `dataset` to `path`, replacing any existing file.
///
/// The content is first written to a temporary file in the same directory and
/// then renamed over `path`.
pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<(), GridError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)
        .map_err(|e| GridError::DirectoryCreation(parent.to_path_buf(), e))?;

    let temp_path = tempfile::Builder::new()
        .prefix(".partial-")
        .suffix(".nc")
        .tempfile_in(parent)
        .map_err(|e| GridError::Persist(path.to_path_buf(), e))?
        .into_temp_path();

    write_netcdf(dataset, &temp_path)?;

    temp_path
        .persist(path)
        .map_err(|e| GridError::Persist(path.to_path_buf(), e.error))?;
    debug!("Saved dataset to {}", path.display());
    Ok(())
}

fn write_netcdf(dataset: &Dataset, path: &Path) -> Result<(), GridError> {
    let mut file = netcdf::create(path).map_err(nc_error(path))?;

    for (name, value) in &dataset.attrs {
        match value {
            AttrValue::Text(text) => file.add_attribute(name, text.as_str()),
            AttrValue::Number(number) => file.add_attribute(name, *number),
        }
        .map_err(nc_error(path))?;
    }
    for (dim, len) in dataset.dims() {
        file.add_dimension(&dim, len).map_err(nc_error(path))?;
    }

    let auxiliary = dataset.auxiliary_coord_names();
    let mut unreferenced = auxiliary.clone();

    for (name, variable) in dataset.coords() {
        write_variable(&mut file, path, name, variable, None)?;
    }
    for (name, variable) in dataset.data_vars() {
        let attached: Vec<&str> = auxiliary
            .iter()
            .filter(|coord| {
                dataset
                    .coord(coord)
                    .is_some_and(|c| c.dims.iter().all(|d| variable.dims.contains(d)))
            })
            .map(String::as_str)
            .collect();
        for coord in &attached {
            unreferenced.remove(*coord);
        }
        let coordinates = (!attached.is_empty()).then(|| attached.join(" "));
        write_variable(&mut file, path, name, variable, coordinates.as_deref())?;
    }

    if !unreferenced.is_empty() {
        let names: Vec<&str> = unreferenced.iter().map(String::as_str).collect();
        file.add_attribute(COORDINATES_ATTR, names.join(" ").as_str())
            .map_err(nc_error(path))?;
    }
    Ok(())
}

fn write_variable(
    file: &mut netcdf::FileMut,
    path: &Path,
    name: &str,
    variable: &Variable,
    coordinates: Option<&str>,
) -> Result<(), GridError> {
    let dims: Vec<&str> = variable.dims.iter().map(String::as_str).collect();

    let mut var = match &variable.values {
        Values::Float(values) => {
            let mut var = file
                .add_variable::<f64>(name, &dims)
                .map_err(nc_error(path))?;
            if !values.is_empty() {
                let flat: Vec<f64> = values.iter().copied().collect();
                var.put_values(&flat, ..).map_err(nc_error(path))?;
            }
            var
        }
        Values::Int(values) => {
            let mut var = file
                .add_variable::<i64>(name, &dims)
                .map_err(nc_error(path))?;
            if !values.is_empty() {
                let flat: Vec<i64> = values.iter().copied().collect();
                var.put_values(&flat, ..).map_err(nc_error(path))?;
            }
            var
        }
        Values::Text(values) => {
            let mut var = file
                .add_string_variable(name, &dims)
                .map_err(nc_error(path))?;
            for (flat, text) in values.iter().enumerate() {
                let index = unravel(flat, values.shape());
                var.put_string(text, index.as_slice())
                    .map_err(nc_error(path))?;
            }
            var
        }
    };

    for (attr, value) in &variable.attrs {
        match value {
            AttrValue::Text(text) => var.put_attribute(attr, text.as_str()),
            AttrValue::Number(number) => var.put_attribute(attr, *number),
        }
        .map_err(nc_error(path))?;
    }
    if let Some(coordinates) = coordinates {
        var.put_attribute(COORDINATES_ATTR, coordinates)
            .map_err(nc_error(path))?;
    }
    Ok(())
}
