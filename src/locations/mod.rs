pub mod error;
pub mod platform;

pub use error::LocationError;
pub use platform::{nearest, resolve, to_file_name, to_folder_name, Platform};
