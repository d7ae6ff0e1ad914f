//! Contains the `ProfileLazyFrame` structure for querying converted profile tables.

use crate::config::DataLayout;
use crate::constants::columns::{HEIGHT, SEASON, UTC_TIME, YEAR};
use crate::locations::platform::Platform;
use crate::tabular::converter::scan_partitions;
use crate::tabular::error::TabularError;
use crate::types::season::Season;
use chrono::{DateTime, Utc};
use polars::prelude::{col, lit, DataType, Expr, LazyFrame, TimeUnit};

/// A wrapper around a Polars `LazyFrame` holding one location's profile table,
/// one row per (UTC time, height).
///
/// Filtering stays lazy; nothing is read from disk until the frame is
/// collected.
#[derive(Clone)]
pub struct ProfileLazyFrame {
    /// The underlying Polars LazyFrame in canonical column order.
    pub frame: LazyFrame,
}

impl ProfileLazyFrame {
    pub fn new(frame: LazyFrame) -> Self {
        Self { frame }
    }

    /// Opens the converted table of a platform given its name or symbol.
    ///
    /// # Errors
    ///
    /// Returns [`TabularError::Location`] for an unknown platform and
    /// [`TabularError::NoPartitions`] when the platform was never converted.
    pub fn read(layout: &DataLayout, representation: &str) -> Result<Self, TabularError> {
        let platform = Platform::from_representation(representation)?;
        Ok(Self::new(scan_partitions(&layout.platform_frame_dir(platform))?))
    }

    /// Filters with an arbitrary Polars predicate.
    pub fn filter(&self, predicate: Expr) -> ProfileLazyFrame {
        ProfileLazyFrame::new(self.frame.clone().filter(predicate))
    }

    /// Keeps the rows whose UTC time lies within `start..=end`.
    pub fn get_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> ProfileLazyFrame {
        let utc = || col(UTC_TIME).cast(DataType::Datetime(TimeUnit::Milliseconds, None));
        self.filter(
            utc()
                .gt_eq(lit(start.naive_utc()))
                .and(utc().lt_eq(lit(end.naive_utc()))),
        )
    }

    /// Keeps the rows of any of `seasons`.
    pub fn get_seasons(&self, seasons: &[Season]) -> ProfileLazyFrame {
        self.filter(any_of(
            seasons
                .iter()
                .map(|season| col(SEASON).eq(lit(season.label()))),
        ))
    }

    /// Keeps the rows at any of `heights` (metres).
    pub fn get_heights(&self, heights: &[f64]) -> ProfileLazyFrame {
        self.filter(any_of(
            heights.iter().map(|height| col(HEIGHT).eq(lit(*height))),
        ))
    }

    /// Keeps the rows of one local calendar year.
    pub fn get_year(&self, year: i32) -> ProfileLazyFrame {
        self.filter(col(YEAR).eq(lit(i64::from(year))))
    }
}

fn any_of(predicates: impl Iterator<Item = Expr>) -> Expr {
    predicates.reduce(|any, next| any.or(next)).unwrap_or_else(|| lit(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use polars::prelude::*;

    fn profile_frame() -> ProfileLazyFrame {
        let hour = 3_600_000i64;
        let frame = df!(
            UTC_TIME => [0, 0, hour, hour, 2 * hour, 2 * hour],
            HEIGHT => [130.0, 140.0, 130.0, 140.0, 130.0, 140.0],
            YEAR => [1969i64, 1969, 1969, 1969, 1970, 1970],
            SEASON => ["Verão", "Verão", "Outono", "Outono", "Verão", "Verão"],
        )
        .unwrap()
        .lazy()
        .with_column(col(UTC_TIME).cast(DataType::Datetime(TimeUnit::Milliseconds, None)));
        ProfileLazyFrame::new(frame)
    }

    #[test]
    fn test_get_range_is_inclusive() {
        let start = Utc.timestamp_opt(3600, 0).unwrap();
        let end = Utc.timestamp_opt(7200, 0).unwrap();
        let df = profile_frame().get_range(start, end).frame.collect().unwrap();
        assert_eq!(df.height(), 4);
    }

    #[test]
    fn test_get_seasons_and_heights() {
        let frame = profile_frame();
        let summer = frame.get_seasons(&[Season::Summer]).frame.collect().unwrap();
        assert_eq!(summer.height(), 4);

        let both = frame
            .get_seasons(&[Season::Summer, Season::Autumn])
            .get_heights(&[140.0])
            .frame
            .collect()
            .unwrap();
        assert_eq!(both.height(), 3);

        let none = frame.get_seasons(&[]).frame.collect().unwrap();
        assert_eq!(none.height(), 0);
    }

    #[test]
    fn test_get_year() {
        let df = profile_frame().get_year(1970).frame.collect().unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_read_unknown_location() {
        let layout = DataLayout::new("/nonexistent");
        let err = ProfileLazyFrame::read(&layout, "atlantis").err().unwrap();
        assert!(matches!(err, TabularError::Location(_)));
    }
}
