use crate::config::DataLayout;
use crate::constants::columns::{CANONICAL_ORDER, HEIGHT, LOCAL_TIME, UTC_TIME};
use crate::grid::dataset::{Dataset, Values, Variable};
use crate::grid::netcdf_io::open_dataset;
use crate::grid::time_axis::is_time_units;
use crate::locations::platform::Platform;
use crate::tabular::error::TabularError;
use log::{debug, info};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes per-location datasets out as partitioned parquet directories.
pub struct Converter {
    layout: DataLayout,
    time_steps_per_partition: usize,
}

impl Converter {
    pub fn new(layout: &DataLayout, time_steps_per_partition: usize) -> Self {
        Self {
            layout: layout.clone(),
            time_steps_per_partition,
        }
    }

    /// Converts the edited dataset of `platform`, replacing earlier output.
    pub fn convert_platform(&self, platform: Platform) -> Result<PathBuf, TabularError> {
        let dataset = open_dataset(&self.layout.platform_dataset_path(platform))?;
        let destination = self.layout.platform_frame_dir(platform);
        let frame = convert(&dataset, &destination, self.time_steps_per_partition)?;
        info!(
            "Converted {} into {} rows at {}",
            platform,
            frame.height(),
            destination.display()
        );
        Ok(destination)
    }

    /// Converts one platform given its name or symbol.
    pub fn convert_location(&self, representation: &str) -> Result<PathBuf, TabularError> {
        self.convert_platform(Platform::from_representation(representation)?)
    }

    /// Converts every known platform in table order, stopping at the first error.
    pub fn convert_all(&self) -> Result<Vec<PathBuf>, TabularError> {
        let total = Platform::ALL.len();
        let mut destinations = Vec::with_capacity(total);
        for (i, platform) in Platform::ALL.into_iter().enumerate() {
            destinations.push(self.convert_platform(platform)?);
            info!("Converted {} ({}/{})", platform, i + 1, total);
        }
        Ok(destinations)
    }
}

/// Builds the time×height frame and the time-only frame of a per-location
/// dataset.
///
/// Data variables laid out as exactly (time, height) go to the first frame,
/// those laid out as exactly (time) go to the second, anything else is left
/// out. Coordinates are broadcast into every frame whose dimensions cover
/// theirs, which is how the local-time column ends up in both.
pub fn split_by_dimensionality(dataset: &Dataset) -> Result<(LazyFrame, LazyFrame), TabularError> {
    let time_steps = dataset
        .dim_len(UTC_TIME)
        .ok_or_else(|| TabularError::MissingDimension(UTC_TIME.to_string()))?;
    let heights = dataset
        .dim_len(HEIGHT)
        .ok_or_else(|| TabularError::MissingDimension(HEIGHT.to_string()))?;

    for (name, variable) in dataset.data_vars() {
        if !variable.has_dims(&[UTC_TIME, HEIGHT]) && !variable.has_dims(&[UTC_TIME]) {
            debug!("Leaving '{}' {:?} out of the frames", name, variable.dims);
        }
    }

    let time_height = build_frame(dataset, &[UTC_TIME, HEIGHT], &[time_steps, heights])?;
    let time_only = build_frame(dataset, &[UTC_TIME], &[time_steps])?;
    Ok((time_height.lazy(), time_only.lazy()))
}

/// Left-joins the time-only columns onto the time×height rows and orders the
/// result by (time, height).
pub fn merge_on_time(
    mut time_height: LazyFrame,
    mut time_only: LazyFrame,
) -> Result<LazyFrame, TabularError> {
    let present = time_height.collect_schema()?;
    // columns already broadcast into the time×height frame would come back
    // with a suffix
    let keep: Vec<Expr> = time_only
        .collect_schema()?
        .iter_names()
        .filter(|name| {
            let name = name.as_str();
            name == UTC_TIME || (name != LOCAL_TIME && present.get(name).is_none())
        })
        .map(|name| col(name.clone()))
        .collect();

    Ok(time_height
        .join(
            time_only.select(keep),
            [col(UTC_TIME)],
            [col(UTC_TIME)],
            JoinArgs::new(JoinType::Left),
        )
        .sort_by_exprs([col(UTC_TIME), col(HEIGHT)], SortMultipleOptions::default()))
}

/// Projects `frame` onto the canonical column order, dropping any other column.
pub fn reorder_columns(mut frame: LazyFrame) -> Result<LazyFrame, TabularError> {
    let schema = frame.collect_schema()?;
    let missing: Vec<String> = CANONICAL_ORDER
        .iter()
        .filter(|column| schema.get(column).is_none())
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TabularError::SchemaMismatch { missing });
    }
    let columns: Vec<Expr> = CANONICAL_ORDER.iter().map(|column| col(*column)).collect();
    Ok(frame.select(columns))
}

/// Flattens `dataset` into the canonical table and writes it to
/// `destination` as `part.<n>.parquet` files of `time_steps_per_partition`
/// time steps each.
///
/// The partitions are written to a hidden sibling directory first and only
/// replace `destination` once all of them are on disk.
pub fn convert(
    dataset: &Dataset,
    destination: &Path,
    time_steps_per_partition: usize,
) -> Result<DataFrame, TabularError> {
    if time_steps_per_partition == 0 {
        return Err(TabularError::EmptyPartition);
    }
    let heights = dataset.dim_len(HEIGHT).unwrap_or(1).max(1);
    let rows_per_partition = time_steps_per_partition.checked_mul(heights).ok_or(
        TabularError::PartitionTooLarge {
            time_steps: time_steps_per_partition,
            heights,
        },
    )?;

    let (time_height, time_only) = split_by_dimensionality(dataset)?;
    let frame = reorder_columns(merge_on_time(time_height, time_only)?)?.collect()?;
    let partitions = write_partitions(&frame, destination, rows_per_partition)?;
    debug!(
        "Wrote {} partitions to {}",
        partitions,
        destination.display()
    );
    Ok(frame)
}

/// Lazily reads every `part.<n>.parquet` file in `directory`, in partition
/// order.
pub fn scan_partitions(directory: &Path) -> Result<LazyFrame, TabularError> {
    let entries =
        fs::read_dir(directory).map_err(|e| TabularError::DirectoryRead(directory.to_path_buf(), e))?;
    let mut parts: Vec<(usize, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let path = entry.path();
            let n = partition_number(&path)?;
            Some((n, path))
        })
        .collect();
    if parts.is_empty() {
        return Err(TabularError::NoPartitions(directory.to_path_buf()));
    }
    parts.sort();

    let frames = parts
        .into_iter()
        .map(|(_, path)| {
            LazyFrame::scan_parquet(&path, Default::default())
                .map_err(|e| TabularError::ParquetScan(path.clone(), e))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(concat(frames, UnionArgs::default())?)
}

fn partition_number(path: &Path) -> Option<usize> {
    path.file_name()?
        .to_str()?
        .strip_prefix("part.")?
        .strip_suffix(".parquet")?
        .parse()
        .ok()
}

fn write_partitions(
    frame: &DataFrame,
    destination: &Path,
    rows_per_partition: usize,
) -> Result<usize, TabularError> {
    let parent = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)
        .map_err(|e| TabularError::DirectoryCreation(parent.to_path_buf(), e))?;
    let staging = tempfile::Builder::new()
        .prefix(".partial-")
        .tempdir_in(parent)
        .map_err(|e| TabularError::DirectoryCreation(parent.to_path_buf(), e))?;

    // an empty frame still gets one file so the schema survives
    let count = frame.height().div_ceil(rows_per_partition).max(1);
    for n in 0..count {
        let mut part = frame.slice((n * rows_per_partition) as i64, rows_per_partition);
        let path = staging.path().join(format!("part.{n}.parquet"));
        let file =
            fs::File::create(&path).map_err(|e| TabularError::ParquetWriteIo(path.clone(), e))?;
        ParquetWriter::new(file)
            .with_compression(ParquetCompression::Snappy)
            .finish(&mut part)
            .map_err(|e| TabularError::ParquetWritePolars(path.clone(), e))?;
    }

    if destination.exists() {
        fs::remove_dir_all(destination)
            .map_err(|e| TabularError::DirectoryReplace(destination.to_path_buf(), e))?;
    }
    fs::rename(staging.path(), destination)
        .map_err(|e| TabularError::DirectoryReplace(destination.to_path_buf(), e))?;
    Ok(count)
}

fn build_frame(
    dataset: &Dataset,
    frame_dims: &[&str],
    frame_shape: &[usize],
) -> Result<DataFrame, TabularError> {
    let mut columns = Vec::new();
    for (name, variable) in dataset.coords() {
        // scalar coordinates (the interpolated latitude/longitude) stay out
        if variable.dims.is_empty() {
            continue;
        }
        if let Some(indices) = row_indices(variable, frame_dims, frame_shape) {
            columns.push(to_column(name, variable, &indices)?);
        }
    }
    for (name, variable) in dataset.data_vars() {
        if !variable.has_dims(frame_dims) {
            continue;
        }
        if let Some(indices) = row_indices(variable, frame_dims, frame_shape) {
            columns.push(to_column(name, variable, &indices)?);
        }
    }
    Ok(DataFrame::new(columns)?)
}

/// For every row of a frame laid out row-major along `frame_dims`, the index
/// into `variable` that feeds it. `None` when the variable has a dimension
/// the frame does not.
fn row_indices(
    variable: &Variable,
    frame_dims: &[&str],
    frame_shape: &[usize],
) -> Option<Vec<Vec<usize>>> {
    let positions: Vec<usize> = variable
        .dims
        .iter()
        .map(|dim| frame_dims.iter().position(|d| *d == dim.as_str()))
        .collect::<Option<_>>()?;

    let rows: usize = frame_shape.iter().product();
    let mut indices = Vec::with_capacity(rows);
    let mut current = vec![0usize; frame_shape.len()];
    for _ in 0..rows {
        indices.push(positions.iter().map(|&axis| current[axis]).collect());
        for axis in (0..current.len()).rev() {
            current[axis] += 1;
            if current[axis] < frame_shape[axis] {
                break;
            }
            current[axis] = 0;
        }
    }
    Some(indices)
}

fn is_datetime(name: &str, variable: &Variable) -> bool {
    name == UTC_TIME || name == LOCAL_TIME || variable.units().is_some_and(is_time_units)
}

fn to_column(
    name: &str,
    variable: &Variable,
    indices: &[Vec<usize>],
) -> Result<Column, TabularError> {
    let column = match &variable.values {
        Values::Float(values) => {
            let floats: Vec<f64> = indices.iter().map(|i| values[i.as_slice()]).collect();
            Column::new(name.into(), floats)
        }
        Values::Int(values) => {
            let ints: Vec<i64> = indices.iter().map(|i| values[i.as_slice()]).collect();
            if is_datetime(name, variable) {
                let millis: Vec<i64> = ints.iter().map(|seconds| seconds * 1000).collect();
                Series::new(name.into(), millis)
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
                    .into()
            } else {
                Column::new(name.into(), ints)
            }
        }
        Values::Text(values) => {
            let texts: Vec<String> = indices
                .iter()
                .map(|i| values[i.as_slice()].clone())
                .collect();
            Column::new(name.into(), texts)
        }
    };
    Ok(column)
}
