use std::fmt;

/// A geographical point: latitude and longitude in decimal degrees.
///
/// # Examples
///
/// ```
/// use era5_profiles::LatLon;
///
/// let namorado = LatLon(-22.45073, -40.41175);
/// assert_eq!(namorado.0, -22.45073); // Latitude
/// assert_eq!(namorado.1, -40.41175); // Longitude
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    pub fn latitude(&self) -> f64 {
        self.0
    }

    pub fn longitude(&self) -> f64 {
        self.1
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.0, self.1)
    }
}
