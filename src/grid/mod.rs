pub mod dataset;
pub mod error;
pub mod filename;
pub mod netcdf_io;
pub mod time_axis;

pub use dataset::{AttrValue, Dataset, Values, Variable};
pub use error::GridError;
pub use filename::GridFileKey;
pub use netcdf_io::{open_dataset, save_dataset};
