//! Derived quantities and calendar fields.

use crate::constants::columns::{
    DAY, HOUR, HOUR_LABEL, LOCAL_TIME, MONTH, MONTH_NAME, SEASON, TEMPERATURE_C, WIND_SPEED, YEAR,
};
use crate::constants::{
    GEOPOTENTIAL, HEIGHT_DIM, HUMIDITY, KELVIN_OFFSET, TEMPERATURE, TIME_DIM, U_WIND, V_WIND,
};
use crate::edit::error::EditError;
use crate::grid::dataset::{Dataset, Values, Variable};
use crate::grid::time_axis::{brasilia_datetime, BRASILIA_OFFSET_SECONDS, EPOCH_SECONDS_UNITS};
use crate::types::season::{month_name, Season};
use chrono::{Datelike, Timelike};
use log::warn;
use ndarray::{ArrayD, IxDyn, Zip};

const PROFILE_QUANTITIES: [&str; 5] = [U_WIND, V_WIND, HUMIDITY, TEMPERATURE, GEOPOTENTIAL];

fn float_of(ds: &Dataset, name: &str) -> Result<ArrayD<f64>, EditError> {
    ds.data_var(name)
        .and_then(|v| v.values.to_float())
        .ok_or_else(|| EditError::MissingVariable(name.to_string()))
}

/// Adds wind speed, Celsius temperature, the local-time coordinate and the
/// calendar fields of each time step.
///
/// Quantities missing from the profile are added as all-`NaN` so that every
/// location yields the same set of columns.
pub fn add_derived(mut ds: Dataset) -> Result<Dataset, EditError> {
    const STAGE: &str = "add_derived";
    let missing_dim = |dim: &str| EditError::MissingDimension {
        stage: STAGE,
        dim: dim.to_string(),
    };
    let time_steps = ds.dim_len(TIME_DIM).ok_or_else(|| missing_dim(TIME_DIM))?;
    let heights = ds.dim_len(HEIGHT_DIM).ok_or_else(|| missing_dim(HEIGHT_DIM))?;

    for quantity in PROFILE_QUANTITIES {
        if !ds.contains(quantity) {
            warn!("'{}' is missing from the profile, filling with NaN", quantity);
            ds.insert_data_var(
                quantity,
                Variable::new(
                    &[TIME_DIM, HEIGHT_DIM],
                    Values::Float(ArrayD::from_elem(IxDyn(&[time_steps, heights]), f64::NAN)),
                ),
            )?;
        }
    }

    let u = float_of(&ds, U_WIND)?;
    let v = float_of(&ds, V_WIND)?;
    let speed = Zip::from(&u).and(&v).map_collect(|u, v| u.hypot(*v));
    let wind_dims = ds.data_var(U_WIND).map(|var| var.dims.clone()).unwrap_or_default();
    ds.insert_data_var(
        WIND_SPEED,
        Variable {
            dims: wind_dims,
            values: Values::Float(speed),
            attrs: Default::default(),
        }
        .with_attr("units", "m s**-1"),
    )?;

    let kelvin = float_of(&ds, TEMPERATURE)?;
    let temperature_dims = ds
        .data_var(TEMPERATURE)
        .map(|var| var.dims.clone())
        .unwrap_or_default();
    ds.insert_data_var(
        TEMPERATURE_C,
        Variable {
            dims: temperature_dims,
            values: Values::Float(kelvin.mapv(|k| k - KELVIN_OFFSET)),
            attrs: Default::default(),
        }
        .with_attr("units", "degC"),
    )?;

    add_calendar(&mut ds)?;
    Ok(ds)
}

fn add_calendar(ds: &mut Dataset) -> Result<(), EditError> {
    let utc: Vec<i64> = match ds.index(TIME_DIM).map(|index| &index.values) {
        Some(Values::Int(values)) => values.iter().copied().collect(),
        Some(Values::Float(values)) => values.iter().map(|v| *v as i64).collect(),
        _ => {
            return Err(EditError::MissingDimension {
                stage: "add_derived",
                dim: TIME_DIM.to_string(),
            })
        }
    };

    let mut local_times = Vec::with_capacity(utc.len());
    let mut years = Vec::with_capacity(utc.len());
    let mut months = Vec::with_capacity(utc.len());
    let mut month_names = Vec::with_capacity(utc.len());
    let mut days = Vec::with_capacity(utc.len());
    let mut hours = Vec::with_capacity(utc.len());
    let mut hour_labels = Vec::with_capacity(utc.len());
    let mut seasons = Vec::with_capacity(utc.len());

    for seconds in utc {
        let local = brasilia_datetime(seconds).ok_or(EditError::InvalidTime(seconds))?;
        local_times.push(seconds + BRASILIA_OFFSET_SECONDS);
        years.push(i64::from(local.year()));
        months.push(i64::from(local.month()));
        month_names.push(month_name(local.month()).unwrap_or_default().to_string());
        days.push(i64::from(local.day()));
        hours.push(i64::from(local.hour()));
        hour_labels.push(format!("{:02}:00", local.hour()));
        seasons.push(
            Season::from_month_day(local.month(), local.day())
                .label()
                .to_string(),
        );
    }

    // wall-clock time in Brasília, stored like the UTC axis
    ds.insert_coord(
        LOCAL_TIME,
        Variable::int_1d(TIME_DIM, local_times)
            .with_attr("units", EPOCH_SECONDS_UNITS)
            .with_attr("long_name", "Brasília local time (UTC-03:00)"),
    )?;
    ds.insert_data_var(YEAR, Variable::int_1d(TIME_DIM, years))?;
    ds.insert_data_var(MONTH, Variable::int_1d(TIME_DIM, months))?;
    ds.insert_data_var(MONTH_NAME, Variable::text_1d(TIME_DIM, month_names))?;
    ds.insert_data_var(DAY, Variable::int_1d(TIME_DIM, days))?;
    ds.insert_data_var(HOUR, Variable::int_1d(TIME_DIM, hours))?;
    ds.insert_data_var(HOUR_LABEL, Variable::text_1d(TIME_DIM, hour_labels))?;
    ds.insert_data_var(SEASON, Variable::text_1d(TIME_DIM, seasons))?;
    Ok(())
}
