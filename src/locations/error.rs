use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("Unknown location '{given}'. Valid names: {names:?}. Valid symbols: {symbols:?}")]
    UnknownLocation {
        given: String,
        names: Vec<&'static str>,
        symbols: Vec<&'static str>,
    },
}
