//! CF time axis decoding.
//!
//! Time coordinates in the raw files are stored as offsets from a reference
//! date (`"hours since 1900-01-01 00:00:00"`, `"seconds since 1970-01-01"`).
//! They are decoded once on read into seconds since the Unix epoch and kept
//! that way for the rest of the pipeline.

use crate::grid::error::GridError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Units of every decoded time axis.
pub const EPOCH_SECONDS_UNITS: &str = "seconds since 1970-01-01";

/// Offset of Brasília local time from UTC, in seconds.
pub const BRASILIA_OFFSET_SECONDS: i64 = -3 * 3600;

/// A parsed `"<unit> since <reference>"` units string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeUnits {
    seconds_per_step: f64,
    reference_epoch_seconds: i64,
}

impl TimeUnits {
    pub fn parse(units: &str) -> Result<Self, GridError> {
        let invalid = || GridError::TimeUnits(units.to_string());
        let (step, reference) = units.trim().split_once(" since ").ok_or_else(invalid)?;

        let seconds_per_step = match step.trim().to_lowercase().as_str() {
            "seconds" | "second" | "secs" | "sec" | "s" => 1.0,
            "minutes" | "minute" | "mins" | "min" => 60.0,
            "hours" | "hour" | "hrs" | "hr" | "h" => 3600.0,
            "days" | "day" | "d" => 86_400.0,
            _ => return Err(invalid()),
        };
        let reference = parse_reference(reference).ok_or_else(invalid)?;

        Ok(Self {
            seconds_per_step,
            reference_epoch_seconds: reference.and_utc().timestamp(),
        })
    }

    /// Converts a stored offset into seconds since the Unix epoch.
    pub fn to_epoch_seconds(&self, value: f64) -> i64 {
        self.reference_epoch_seconds + (value * self.seconds_per_step).round() as i64
    }
}

/// Whether a units string describes a time axis.
pub fn is_time_units(units: &str) -> bool {
    units.contains(" since ")
}

fn parse_reference(reference: &str) -> Option<NaiveDateTime> {
    let cleaned = reference
        .trim()
        .trim_end_matches(" UTC")
        .trim_end_matches('Z')
        .trim_end_matches(" +00:00")
        .trim();

    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(cleaned, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(cleaned, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// UTC date and time of an epoch-seconds value.
pub fn utc_datetime(epoch_seconds: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(epoch_seconds, 0).map(|dt| dt.naive_utc())
}

/// Brasília wall-clock date and time of an epoch-seconds value.
pub fn brasilia_datetime(epoch_seconds: i64) -> Option<NaiveDateTime> {
    let offset = FixedOffset::east_opt(BRASILIA_OFFSET_SECONDS as i32)?;
    DateTime::from_timestamp(epoch_seconds, 0).map(|dt| dt.with_timezone(&offset).naive_local())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_hours_since_1900() {
        let units = TimeUnits::parse("hours since 1900-01-01 00:00:00.0").unwrap();
        // 2020-06-01T00:00:00Z is 1_055_544 hours after 1900-01-01.
        assert_eq!(units.to_epoch_seconds(1_055_544.0), 1_590_969_600);
    }

    #[test]
    fn test_parse_seconds_since_epoch_date_only() {
        let units = TimeUnits::parse(EPOCH_SECONDS_UNITS).unwrap();
        assert_eq!(units.to_epoch_seconds(3600.0), 3600);
    }

    #[test]
    fn test_parse_rejects_unknown_units() {
        assert!(TimeUnits::parse("fortnights since 2000-01-01").is_err());
        assert!(TimeUnits::parse("hours").is_err());
        assert!(TimeUnits::parse("hours since yesterday").is_err());
    }

    #[test]
    fn test_brasilia_time_is_three_hours_behind() {
        // 2020-01-01T01:00:00Z
        let local = brasilia_datetime(1_577_840_400).unwrap();
        assert_eq!(local.year(), 2019);
        assert_eq!(local.month(), 12);
        assert_eq!(local.day(), 31);
        assert_eq!(local.hour(), 22);

        let utc = utc_datetime(1_577_840_400).unwrap();
        assert_eq!(utc.hour(), 1);
    }
}
