use crate::grid::error::GridError;
use crate::locations::error::LocationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("Variable '{0}' is required but missing from the dataset")]
    MissingVariable(String),

    #[error("Stage '{stage}' needs dimension '{dim}', which the dataset lacks")]
    MissingDimension { stage: &'static str, dim: String },

    #[error("Variable '{variable}' has dimensions {found:?}, expected {expected:?}")]
    UnexpectedLayout {
        variable: String,
        expected: Vec<&'static str>,
        found: Vec<String>,
    },

    #[error("Timestamp {0} is outside the representable date range")]
    InvalidTime(i64),

    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Location(#[from] LocationError),
}
