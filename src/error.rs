use crate::config::ConfigError;
use crate::edit::error::EditError;
use crate::grid::error::GridError;
use crate::locations::error::LocationError;
use crate::tabular::error::TabularError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    Tabular(#[from] TabularError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
