use ndarray::ShapeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GridError {
    #[error("Path '{0}' does not exist")]
    NotFound(PathBuf),

    #[error("No grid files matching the naming convention were found in '{0}'")]
    NoGridFiles(PathBuf),

    #[error("Failed to list directory '{0}'")]
    DirectoryRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to create directory '{0}'")]
    DirectoryCreation(PathBuf, #[source] std::io::Error),

    #[error("NetCDF operation failed for '{path}'")]
    NetCdf {
        path: PathBuf,
        #[source]
        source: netcdf::Error,
    },

    #[error("Failed to replace '{0}' with the freshly written file")]
    Persist(PathBuf, #[source] std::io::Error),

    // Incompatible dimensions or coordinates while concatenating or merging
    #[error("Cannot combine datasets along '{dim}': {reason}")]
    MergeMismatch { dim: String, reason: String },

    #[error("Dimension '{dim}' has conflicting lengths {existing} and {found} (variable '{variable}')")]
    DimensionConflict {
        dim: String,
        variable: String,
        existing: usize,
        found: usize,
    },

    #[error("Values of variable '{variable}' do not fit its dimensions")]
    Shape {
        variable: String,
        #[source]
        source: ShapeError,
    },

    #[error("Variable '{0}' not found in dataset")]
    MissingVariable(String),

    #[error("Variable '{variable}' has type {found}, expected {expected}")]
    UnexpectedType {
        variable: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unsupported time units '{0}'")]
    TimeUnits(String),
}
