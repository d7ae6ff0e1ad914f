//! In-memory representation of a gridded dataset.
//!
//! A [`Dataset`] is a collection of named [`Variable`]s sharing named
//! dimensions. Variables are split into coordinates (index coordinates such
//! as `valid_time`, plus auxiliary ones such as a local-time axis) and data
//! variables (the meteorological quantities). Values are stored as dynamic
//! dimensional `ndarray` arrays in C order, matching the dimension list.

use crate::grid::error::GridError;
use ndarray::{ArrayD, Axis, ErrorKind, IxDyn, ShapeError};
use ordered_float::OrderedFloat;
use std::collections::{BTreeMap, BTreeSet};

/// Attribute value attached to a variable or to the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Number(f64),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Number(value)
    }
}

/// Typed storage of a variable's values.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    /// Floating point data; missing values are `NaN`.
    Float(ArrayD<f64>),
    /// Integer data such as decoded time axes (epoch seconds) or calendar fields.
    Int(ArrayD<i64>),
    Text(ArrayD<String>),
}

impl Values {
    pub fn shape(&self) -> &[usize] {
        match self {
            Values::Float(a) => a.shape(),
            Values::Int(a) => a.shape(),
            Values::Text(a) => a.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Values::Float(_) => "float",
            Values::Int(_) => "int",
            Values::Text(_) => "text",
        }
    }

    pub fn as_float(&self) -> Option<&ArrayD<f64>> {
        match self {
            Values::Float(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&ArrayD<i64>> {
        match self {
            Values::Int(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&ArrayD<String>> {
        match self {
            Values::Text(a) => Some(a),
            _ => None,
        }
    }

    /// Numeric values as floats; integers are widened, text yields `None`.
    pub fn to_float(&self) -> Option<ArrayD<f64>> {
        match self {
            Values::Float(a) => Some(a.clone()),
            Values::Int(a) => Some(a.mapv(|v| v as f64)),
            Values::Text(_) => None,
        }
    }

    /// One-dimensional numeric values as ordered keys, used to align indexes.
    pub fn index_keys(&self) -> Option<Vec<OrderedFloat<f64>>> {
        if self.ndim() != 1 {
            return None;
        }
        self.to_float()
            .map(|a| a.iter().map(|v| OrderedFloat(*v)).collect())
    }

    pub fn index_axis(&self, axis: usize, index: usize) -> Values {
        match self {
            Values::Float(a) => Values::Float(a.index_axis(Axis(axis), index).to_owned()),
            Values::Int(a) => Values::Int(a.index_axis(Axis(axis), index).to_owned()),
            Values::Text(a) => Values::Text(a.index_axis(Axis(axis), index).to_owned()),
        }
    }

    /// Adds a length-one axis at `axis`.
    pub fn insert_axis(self, axis: usize) -> Values {
        match self {
            Values::Float(a) => Values::Float(a.insert_axis(Axis(axis))),
            Values::Int(a) => Values::Int(a.insert_axis(Axis(axis))),
            Values::Text(a) => Values::Text(a.insert_axis(Axis(axis))),
        }
    }

    /// Joins values along an existing axis.
    ///
    /// Mixed integer and float parts are joined as floats; text can only be
    /// joined with text.
    pub fn concatenate(axis: usize, parts: &[&Values]) -> Result<Values, ShapeError> {
        let incompatible = || ShapeError::from_kind(ErrorKind::IncompatibleLayout);
        if parts.is_empty() {
            return Err(incompatible());
        }

        if parts.iter().all(|p| matches!(p, Values::Int(_))) {
            let views: Vec<_> = parts
                .iter()
                .filter_map(|p| p.as_int())
                .map(|a| a.view())
                .collect();
            return ndarray::concatenate(Axis(axis), &views).map(Values::Int);
        }
        if parts.iter().all(|p| matches!(p, Values::Text(_))) {
            let views: Vec<_> = parts
                .iter()
                .filter_map(|p| p.as_text())
                .map(|a| a.view())
                .collect();
            return ndarray::concatenate(Axis(axis), &views).map(Values::Text);
        }

        let floats = parts
            .iter()
            .map(|p| p.to_float())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(incompatible)?;
        let views: Vec<_> = floats.iter().map(|a| a.view()).collect();
        ndarray::concatenate(Axis(axis), &views).map(Values::Float)
    }

    /// Rebuilds the values along `axis` following `mapping`: entry `i` of the
    /// result takes the old position `mapping[i]`, or a missing value.
    ///
    /// Missing floats are `NaN`, integer values gaining gaps become floats,
    /// missing text is empty.
    pub fn reindex_axis(&self, axis: usize, mapping: &[Option<usize>]) -> Values {
        let has_gaps = mapping.iter().any(Option::is_none);
        let mut shape = self.shape().to_vec();
        shape[axis] = mapping.len();

        match self {
            Values::Int(a) if !has_gaps => Values::Int(reindex(a, axis, mapping, &shape, 0)),
            Values::Text(a) => Values::Text(reindex(a, axis, mapping, &shape, String::new())),
            other => {
                let floats = other.to_float().unwrap_or_default();
                Values::Float(reindex(&floats, axis, mapping, &shape, f64::NAN))
            }
        }
    }
}

fn reindex<A: Clone>(
    source: &ArrayD<A>,
    axis: usize,
    mapping: &[Option<usize>],
    shape: &[usize],
    fill: A,
) -> ArrayD<A> {
    let mut target = ArrayD::from_elem(IxDyn(shape), fill);
    for (new_position, old_position) in mapping.iter().enumerate() {
        if let Some(old_position) = old_position {
            target
                .index_axis_mut(Axis(axis), new_position)
                .assign(&source.index_axis(Axis(axis), *old_position));
        }
    }
    target
}

/// A named-dimension array with attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub values: Values,
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Variable {
    pub fn new<S: AsRef<str>>(dims: &[S], values: Values) -> Self {
        Self {
            dims: dims.iter().map(|d| d.as_ref().to_string()).collect(),
            values,
            attrs: BTreeMap::new(),
        }
    }

    /// One-dimensional float variable along `dim`.
    pub fn float_1d(dim: &str, values: Vec<f64>) -> Self {
        let len = values.len();
        Self::new(
            &[dim],
            Values::Float(ArrayD::from_shape_vec(IxDyn(&[len]), values).unwrap_or_default()),
        )
    }

    /// One-dimensional integer variable along `dim`.
    pub fn int_1d(dim: &str, values: Vec<i64>) -> Self {
        let len = values.len();
        Self::new(
            &[dim],
            Values::Int(ArrayD::from_shape_vec(IxDyn(&[len]), values).unwrap_or_default()),
        )
    }

    /// One-dimensional text variable along `dim`.
    pub fn text_1d(dim: &str, values: Vec<String>) -> Self {
        let len = values.len();
        Self::new(
            &[dim],
            Values::Text(ArrayD::from_shape_vec(IxDyn(&[len]), values).unwrap_or_default()),
        )
    }

    pub fn scalar(value: f64) -> Self {
        Self::new::<&str>(&[], Values::Float(ArrayD::from_elem(IxDyn(&[]), value)))
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }

    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    pub fn has_dims(&self, dims: &[&str]) -> bool {
        self.dims.len() == dims.len() && self.dims.iter().zip(dims).all(|(a, b)| a == b)
    }

    pub fn units(&self) -> Option<&str> {
        match self.attrs.get("units") {
            Some(AttrValue::Text(units)) => Some(units),
            _ => None,
        }
    }
}

/// Named variables over shared named dimensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    coords: BTreeMap<String, Variable>,
    data_vars: BTreeMap<String, Variable>,
    pub attrs: BTreeMap<String, AttrValue>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_coord(&mut self, name: &str, variable: Variable) -> Result<(), GridError> {
        self.check_variable(name, &variable)?;
        self.data_vars.remove(name);
        self.coords.insert(name.to_string(), variable);
        Ok(())
    }

    pub fn insert_data_var(&mut self, name: &str, variable: Variable) -> Result<(), GridError> {
        self.check_variable(name, &variable)?;
        self.coords.remove(name);
        self.data_vars.insert(name.to_string(), variable);
        Ok(())
    }

    pub fn coord(&self, name: &str) -> Option<&Variable> {
        self.coords.get(name)
    }

    pub fn data_var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name)
    }

    /// Looks a name up among data variables first, then coordinates.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.data_vars.get(name).or_else(|| self.coords.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    pub fn is_coord(&self, name: &str) -> bool {
        self.coords.contains_key(name)
    }

    pub fn coords(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.coords.iter()
    }

    pub fn data_vars(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.data_vars.iter()
    }

    pub fn data_var_names(&self) -> Vec<String> {
        self.data_vars.keys().cloned().collect()
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.data_vars
            .remove(name)
            .or_else(|| self.coords.remove(name))
    }

    /// The index coordinate of a dimension: a coordinate named after the
    /// dimension and laid out along it.
    pub fn index(&self, dim: &str) -> Option<&Variable> {
        self.coords.get(dim).filter(|v| v.has_dims(&[dim]))
    }

    pub fn is_index_coord(&self, name: &str) -> bool {
        self.index(name).is_some()
    }

    /// Lengths of every dimension used by any variable.
    pub fn dims(&self) -> BTreeMap<String, usize> {
        let mut dims = BTreeMap::new();
        for variable in self.coords.values().chain(self.data_vars.values()) {
            for (dim, len) in variable.dims.iter().zip(variable.values.shape()) {
                dims.entry(dim.clone()).or_insert(*len);
            }
        }
        dims
    }

    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.dims().get(dim).copied()
    }

    /// Renames a variable and/or a dimension, like renaming a key that may be
    /// both at once (`valid_time` is a dimension and its own index).
    pub fn rename(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }
        if let Some(variable) = self.coords.remove(old) {
            self.coords.insert(new.to_string(), variable);
        }
        if let Some(variable) = self.data_vars.remove(old) {
            self.data_vars.insert(new.to_string(), variable);
        }
        for variable in self.coords.values_mut().chain(self.data_vars.values_mut()) {
            for dim in variable.dims.iter_mut() {
                if dim == old {
                    *dim = new.to_string();
                }
            }
        }
    }

    /// Names of coordinates that are not the index of their own dimension.
    pub fn auxiliary_coord_names(&self) -> BTreeSet<String> {
        self.coords
            .keys()
            .filter(|name| !self.is_index_coord(name))
            .cloned()
            .collect()
    }

    fn check_variable(&self, name: &str, variable: &Variable) -> Result<(), GridError> {
        if variable.values.ndim() != variable.dims.len() {
            return Err(GridError::Shape {
                variable: name.to_string(),
                source: ShapeError::from_kind(ErrorKind::IncompatibleShape),
            });
        }
        for (other_name, other) in self.coords.iter().chain(self.data_vars.iter()) {
            if other_name == name {
                continue;
            }
            for (dim, len) in variable.dims.iter().zip(variable.values.shape()) {
                if let Some(axis) = other.axis_of(dim) {
                    let existing = other.values.shape()[axis];
                    if existing != *len {
                        return Err(GridError::DimensionConflict {
                            dim: dim.clone(),
                            variable: name.to_string(),
                            existing,
                            found: *len,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
