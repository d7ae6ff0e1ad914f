//! Naming convention of the raw grid files delivered by the download step.
//!
//! Every raw file carries its variable, year and pressure level in its name:
//! `(var-temperature)_(ano-2020)_(pressao-900).nc`. The tokens are matched
//! non-greedily, so the variable ends at the first `)_(ano-` that is followed
//! by a complete year and pressure token.

use std::fmt;

const VAR_OPEN: &str = "(var-";
const YEAR_OPEN: &str = ")_(ano-";
const PRESSURE_OPEN: &str = ")_(pressao-";
const EXTENSION: &str = "nc";

/// The (variable, year, pressure level) triple encoded in a grid file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridFileKey {
    /// Variable as requested from the data store, e.g. `"temperature"`.
    pub variable: String,
    pub year: i32,
    /// Pressure level in hPa.
    pub pressure_level: u32,
}

impl GridFileKey {
    pub fn new(variable: impl Into<String>, year: i32, pressure_level: u32) -> Self {
        Self {
            variable: variable.into(),
            year,
            pressure_level,
        }
    }

    pub fn file_name(&self) -> String {
        encode(&self.variable, self.year, self.pressure_level)
    }
}

impl fmt::Display for GridFileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} hPa / {}",
            self.variable, self.pressure_level, self.year
        )
    }
}

/// Builds the file name for a (variable, year, pressure level) triple.
///
/// The year is zero-padded to four digits.
pub fn encode(variable: &str, year: i32, pressure_level: u32) -> String {
    format!("(var-{variable})_(ano-{year:04})_(pressao-{pressure_level}).nc")
}

/// Extracts the triple from a file name.
///
/// Returns `None` when the name does not follow the convention; this is the
/// signal for "not a grid file", never an error. The pattern is searched
/// anywhere in the name, so a full path decodes as well as a bare file name.
pub fn decode(name: &str) -> Option<GridFileKey> {
    for (start, _) in name.match_indices(VAR_OPEN) {
        let body = start + VAR_OPEN.len();
        // Candidate variable ends in increasing order: shortest match first.
        for (offset, _) in name[body..].match_indices(YEAR_OPEN) {
            if offset == 0 {
                continue;
            }
            let variable = &name[body..body + offset];
            if variable.contains('\n') {
                break;
            }
            let rest = &name[body + offset + YEAR_OPEN.len()..];
            if let Some((year, pressure_level)) = match_year_and_pressure(rest) {
                return Some(GridFileKey::new(variable, year, pressure_level));
            }
        }
    }
    None
}

/// Matches `dddd)_(pressao-d+).nc` at the start of `rest`.
fn match_year_and_pressure(rest: &str) -> Option<(i32, u32)> {
    let year_digits = rest.get(..4)?;
    if !year_digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let rest = rest[4..].strip_prefix(PRESSURE_OPEN)?;

    let digit_count = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digit_count == 0 {
        return None;
    }
    let (pressure_digits, rest) = rest.split_at(digit_count);
    let rest = rest.strip_prefix(')')?;

    // `.nc` in the pattern: any single character followed by the extension
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c != '\n' => {}
        _ => return None,
    }
    if !chars.as_str().starts_with(EXTENSION) {
        return None;
    }

    let year = year_digits.parse().ok()?;
    let pressure_level = pressure_digits.parse().ok()?;
    Some((year, pressure_level))
}
