use crate::grid::error::GridError;
use crate::locations::error::LocationError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TabularError {
    #[error("Frame is missing the required columns {missing:?}")]
    SchemaMismatch { missing: Vec<String> },

    #[error("Dataset has no '{0}' dimension to lay rows out along")]
    MissingDimension(String),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("I/O error writing parquet file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),
    #[error("Encoding error writing parquet file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to scan parquet file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("No parquet partitions found in '{0}'")]
    NoPartitions(PathBuf),

    #[error("Failed to create directory '{0}'")]
    DirectoryCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to read directory '{0}'")]
    DirectoryRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to replace '{0}' with the new partitions")]
    DirectoryReplace(PathBuf, #[source] std::io::Error),

    #[error("A partition must hold at least one time step")]
    EmptyPartition,

    #[error("{time_steps} time steps of {heights} heights do not fit in one partition")]
    PartitionTooLarge { time_steps: usize, heights: usize },

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Location(#[from] LocationError),
}
