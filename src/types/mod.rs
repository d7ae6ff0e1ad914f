pub mod lat_lon;
pub mod profile_frame;
pub mod season;
