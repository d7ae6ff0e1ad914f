//! Names and fixed values shared across the pipeline.
//!
//! Column and variable identifiers keep the names used by the downstream
//! analysis tools (`tempo_UTC0`, `vel_u`, `estacao`, ...), so they are part of
//! the on-disk interface and must not be translated.

/// Dimensions of the raw and unified grids.
pub const TIME_DIM: &str = "valid_time";
pub const PRESSURE_DIM: &str = "pressure_level";
pub const LATITUDE_DIM: &str = "latitude";
pub const LONGITUDE_DIM: &str = "longitude";
/// Vertical dimension created by height interpolation.
pub const HEIGHT_DIM: &str = "altura";

/// Variables delivered by the data store that carry no information.
pub const UNWANTED_VARIABLES: [&str; 2] = ["number", "expver"];

/// Standard gravity in m/s², converts geopotential to height.
pub const STANDARD_GRAVITY: f64 = 9.80665;

pub const KELVIN_OFFSET: f64 = 273.15;

/// Requested variable names and their short names inside the grid files.
pub const REQUESTED_VARIABLES: [(&str, &str); 5] = [
    ("u_component_of_wind", "u"),
    ("v_component_of_wind", "v"),
    ("relative_humidity", "r"),
    ("temperature", "t"),
    ("geopotential", "z"),
];

/// Short name expected inside a grid file requested as `variable`.
pub fn short_name(variable: &str) -> Option<&'static str> {
    REQUESTED_VARIABLES
        .iter()
        .find(|(requested, _)| *requested == variable)
        .map(|(_, short)| *short)
}

pub const U_WIND: &str = "u";
pub const V_WIND: &str = "v";
pub const HUMIDITY: &str = "r";
pub const TEMPERATURE: &str = "t";
pub const GEOPOTENTIAL: &str = "z";

/// Target heights in metres: 130 to 350 inclusive every 10 m.
pub fn target_heights() -> Vec<f64> {
    (130..=350).step_by(10).map(f64::from).collect()
}

/// Canonical column identifiers of the converted profiles.
pub mod columns {
    pub const UTC_TIME: &str = "tempo_UTC0";
    pub const LOCAL_TIME: &str = "tempo_bras";
    pub const HEIGHT: &str = "h";
    pub const U_WIND: &str = "vel_u";
    pub const V_WIND: &str = "vel_v";
    pub const WIND_SPEED: &str = "vel_res";
    pub const TEMPERATURE_K: &str = "t_K";
    pub const TEMPERATURE_C: &str = "t_C";
    pub const HUMIDITY: &str = "r";
    pub const GEOPOTENTIAL: &str = "z";
    pub const YEAR: &str = "ano";
    pub const MONTH: &str = "mes";
    pub const MONTH_NAME: &str = "mes_nome";
    pub const DAY: &str = "dia";
    pub const HOUR: &str = "hora";
    pub const HOUR_LABEL: &str = "hora_str";
    pub const SEASON: &str = "estacao";

    /// Column order of every persisted profile frame.
    pub const CANONICAL_ORDER: [&str; 17] = [
        YEAR,
        SEASON,
        MONTH_NAME,
        DAY,
        HOUR_LABEL,
        HEIGHT,
        U_WIND,
        V_WIND,
        WIND_SPEED,
        TEMPERATURE_C,
        TEMPERATURE_K,
        HUMIDITY,
        GEOPOTENTIAL,
        LOCAL_TIME,
        MONTH,
        HOUR,
        UTC_TIME,
    ];
}

/// Old name to canonical name, applied to variables and dimensions alike.
pub const RENAMES: [(&str, &str); 5] = [
    (TIME_DIM, columns::UTC_TIME),
    (TEMPERATURE, columns::TEMPERATURE_K),
    (U_WIND, columns::U_WIND),
    (V_WIND, columns::V_WIND),
    (HEIGHT_DIM, columns::HEIGHT),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_heights() {
        let heights = target_heights();
        assert_eq!(heights.len(), 23);
        assert_eq!(heights.first(), Some(&130.0));
        assert_eq!(heights.last(), Some(&350.0));
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("geopotential"), Some("z"));
        assert_eq!(short_name("temperature"), Some("t"));
        assert_eq!(short_name("pressure"), None);
    }
}
