use crate::locations::error::LocationError;
use crate::types::lat_lon::LatLon;
use haversine::{distance, Location as HaversineLocation, Units};
use ordered_float::OrderedFloat;
use std::fmt;
use std::str::FromStr;

/// The offshore platforms of the Campos Basin for which profiles are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    Namorado2,
    Petrobras26,
    Petrobras32,
    Petrobras37,
    PetrobrasIX,
    PetrobrasXIX,
    PetrobrasXXXIII,
    Vermelho1,
    Vermelho2,
}

impl Platform {
    /// Every platform in table order (`p1` to `p9`).
    pub const ALL: [Platform; 9] = [
        Platform::Namorado2,
        Platform::Petrobras26,
        Platform::Petrobras32,
        Platform::Petrobras37,
        Platform::PetrobrasIX,
        Platform::PetrobrasXIX,
        Platform::PetrobrasXXXIII,
        Platform::Vermelho1,
        Platform::Vermelho2,
    ];

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Namorado2 => "NAMORADO 2 (PNA-2)",
            Platform::Petrobras26 => "PETROBRAS 26 (P-26)",
            Platform::Petrobras32 => "PETROBRAS 32 (P-32)",
            Platform::Petrobras37 => "PETROBRAS 37 (P-37)",
            Platform::PetrobrasIX => "PETROBRAS IX",
            Platform::PetrobrasXIX => "PETROBRAS XIX",
            Platform::PetrobrasXXXIII => "PETROBRAS XXXIII",
            Platform::Vermelho1 => "VERMELHO 1 (PVM-1)",
            Platform::Vermelho2 => "VERMELHO 2 (PVM-2)",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Platform::Namorado2 => "p1",
            Platform::Petrobras26 => "p2",
            Platform::Petrobras32 => "p3",
            Platform::Petrobras37 => "p4",
            Platform::PetrobrasIX => "p5",
            Platform::PetrobrasXIX => "p6",
            Platform::PetrobrasXXXIII => "p7",
            Platform::Vermelho1 => "p8",
            Platform::Vermelho2 => "p9",
        }
    }

    pub fn coords(&self) -> LatLon {
        match self {
            Platform::Namorado2 => LatLon(-22.45073, -40.41175),
            Platform::Petrobras26 => LatLon(-22.4684, -40.02869),
            Platform::Petrobras32 => LatLon(-22.2051, -40.1431),
            Platform::Petrobras37 => LatLon(-22.4868, -40.09779),
            Platform::PetrobrasIX => LatLon(-22.57358, -40.82192),
            Platform::PetrobrasXIX => LatLon(-22.3927, -40.05438),
            Platform::PetrobrasXXXIII => LatLon(-22.37, -40.0267),
            Platform::Vermelho1 => LatLon(-22.16065, -40.27872),
            Platform::Vermelho2 => LatLon(-22.17535, -40.29147),
        }
    }

    /// Storage folder of the platform's tabular output, e.g. `p1-NAMORADO_2_(PNA-2)`.
    pub fn folder_name(&self) -> String {
        format!("{}-{}", self.symbol(), self.name().replace(' ', "_"))
    }

    /// File name of the platform's edited dataset.
    pub fn file_name(&self) -> String {
        format!("{}.nc", self.folder_name())
    }

    /// Resolves a canonical name or a symbol.
    pub fn from_representation(representation: &str) -> Result<Platform, LocationError> {
        Platform::ALL
            .iter()
            .find(|p| p.name() == representation || p.symbol() == representation)
            .copied()
            .ok_or_else(|| unknown(representation))
    }

    /// Resolves a canonical name only.
    pub fn from_name(name: &str) -> Result<Platform, LocationError> {
        Platform::ALL
            .iter()
            .find(|p| p.name() == name)
            .copied()
            .ok_or_else(|| unknown(name))
    }
}

fn unknown(given: &str) -> LocationError {
    LocationError::UnknownLocation {
        given: given.to_string(),
        names: Platform::ALL.iter().map(Platform::name).collect(),
        symbols: Platform::ALL.iter().map(Platform::symbol).collect(),
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Platform {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::from_representation(s)
    }
}

/// Canonical name of a platform given its name or symbol.
pub fn resolve(representation: &str) -> Result<&'static str, LocationError> {
    Platform::from_representation(representation).map(|p| p.name())
}

pub fn to_file_name(canonical_name: &str) -> Result<String, LocationError> {
    Platform::from_name(canonical_name).map(|p| p.file_name())
}

pub fn to_folder_name(canonical_name: &str) -> Result<String, LocationError> {
    Platform::from_name(canonical_name).map(|p| p.folder_name())
}

/// The platform closest to `point` and its great-circle distance in km.
pub fn nearest(point: LatLon) -> (Platform, f64) {
    let (platform, distance_km) = Platform::ALL
        .iter()
        .map(|platform| {
            let coords = platform.coords();
            let distance_km = distance(
                HaversineLocation {
                    latitude: coords.0,
                    longitude: coords.1,
                },
                HaversineLocation {
                    latitude: point.0,
                    longitude: point.1,
                },
                Units::Kilometers,
            );
            (*platform, OrderedFloat(distance_km))
        })
        .min_by_key(|(_, distance_km)| *distance_km)
        .unwrap_or((Platform::Namorado2, OrderedFloat(f64::NAN)));
    (platform, distance_km.into_inner())
}
