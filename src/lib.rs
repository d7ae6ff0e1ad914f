pub mod config;
pub mod constants;
pub mod edit;
mod error;
pub mod grid;
pub mod locations;
mod pipeline;
pub mod tabular;
mod types;
pub mod unify;

pub use error::PipelineError;
pub use pipeline::*;

pub use config::{ConfigError, DataLayout, FailurePolicy, PipelineConfig};

pub use grid::{open_dataset, save_dataset, AttrValue, Dataset, GridError, GridFileKey, Values, Variable};
pub use unify::Unifier;
pub use edit::{EditError, Editor, Stage};
pub use tabular::{Converter, TabularError};
pub use locations::{LocationError, Platform};

pub use types::lat_lon::LatLon;
pub use types::profile_frame::ProfileLazyFrame;
pub use types::season::{month_name, Season};
