use crate::constants::{target_heights, RENAMES, UNWANTED_VARIABLES};
use crate::edit::derived::add_derived;
use crate::edit::error::EditError;
use crate::edit::interpolation::{interpolate_heights, interpolate_point};
use crate::grid::dataset::Dataset;
use crate::types::lat_lon::LatLon;
use log::debug;

/// One step of the per-location editing sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    /// Drops the bookkeeping variables `number` and `expver`.
    RemoveUnwanted,
    /// Reduces the horizontal grid to a single point.
    InterpolatePoint(LatLon),
    /// Replaces the pressure axis by the fixed target heights.
    InterpolateHeights,
    AddDerived,
    /// Applies the canonical variable and dimension names.
    Rename,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::RemoveUnwanted => "remove_unwanted",
            Stage::InterpolatePoint(_) => "interpolate_point",
            Stage::InterpolateHeights => "interpolate_heights",
            Stage::AddDerived => "add_derived",
            Stage::Rename => "rename",
        }
    }

    pub fn apply(&self, dataset: Dataset) -> Result<Dataset, EditError> {
        debug!("Applying stage {}", self.name());
        match self {
            Stage::RemoveUnwanted => Ok(remove_unwanted(dataset)),
            Stage::InterpolatePoint(target) => interpolate_point(dataset, *target),
            Stage::InterpolateHeights => interpolate_heights(dataset, &target_heights()),
            Stage::AddDerived => add_derived(dataset),
            Stage::Rename => Ok(rename(dataset)),
        }
    }
}

/// The fixed editing sequence for a location at `target`.
pub fn standard_stages(target: LatLon) -> [Stage; 5] {
    [
        Stage::RemoveUnwanted,
        Stage::InterpolatePoint(target),
        Stage::InterpolateHeights,
        Stage::AddDerived,
        Stage::Rename,
    ]
}

/// Runs `stages` in order.
pub fn apply_all(dataset: Dataset, stages: &[Stage]) -> Result<Dataset, EditError> {
    stages
        .iter()
        .try_fold(dataset, |dataset, stage| stage.apply(dataset))
}

fn remove_unwanted(mut dataset: Dataset) -> Dataset {
    for name in UNWANTED_VARIABLES {
        if dataset.remove(name).is_some() {
            debug!("Removed '{}'", name);
        }
    }
    dataset
}

fn rename(mut dataset: Dataset) -> Dataset {
    for (old, new) in RENAMES {
        dataset.rename(old, new);
    }
    dataset
}
