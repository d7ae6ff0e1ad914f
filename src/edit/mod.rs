//! Per-location editing: the unified grid reduced to one vertical profile
//! time series, with derived variables and canonical names.

pub mod derived;
pub mod editor;
pub mod error;
pub mod interpolation;
pub mod stage;

pub use editor::Editor;
pub use error::EditError;
pub use stage::{apply_all, standard_stages, Stage};
