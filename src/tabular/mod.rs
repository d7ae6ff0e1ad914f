//! Flattening per-location datasets into the canonical parquet table.

pub mod converter;
pub mod error;

pub use converter::{
    convert, merge_on_time, reorder_columns, scan_partitions, split_by_dimensionality, Converter,
};
pub use error::TabularError;
