use era5_profiles::constants::columns::{
    CANONICAL_ORDER, HEIGHT, TEMPERATURE_C, TEMPERATURE_K, UTC_TIME, YEAR,
};
use era5_profiles::constants::{target_heights, LATITUDE_DIM, LONGITUDE_DIM, TIME_DIM};
use era5_profiles::grid::filename::encode;
use era5_profiles::tabular::scan_partitions;
use era5_profiles::{
    save_dataset, Converter, DataLayout, Dataset, Editor, FailurePolicy, Pipeline, Platform,
    ProfileLazyFrame, Season, Unifier, Values, Variable,
};
use ndarray::{ArrayD, IxDyn};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// 2020-06-01T00:00:00Z
const START: i64 = 1_590_969_600;
const TIME_STEPS: usize = 6;

fn raw_grid(short_name: &str, value: f64) -> Dataset {
    let times: Vec<i64> = (0..TIME_STEPS as i64).map(|i| START + i * 3600).collect();
    let mut ds = Dataset::new();
    ds.insert_coord(
        TIME_DIM,
        Variable::int_1d(TIME_DIM, times).with_attr("units", "seconds since 1970-01-01"),
    )
    .unwrap();
    ds.insert_coord(LATITUDE_DIM, Variable::float_1d(LATITUDE_DIM, vec![-22.0, -23.0]))
        .unwrap();
    ds.insert_coord(LONGITUDE_DIM, Variable::float_1d(LONGITUDE_DIM, vec![-41.0, -40.0]))
        .unwrap();
    let values = ArrayD::from_elem(IxDyn(&[TIME_STEPS, 2, 2]), value);
    ds.insert_data_var(
        short_name,
        Variable::new(&[TIME_DIM, LATITUDE_DIM, LONGITUDE_DIM], Values::Float(values)),
    )
    .unwrap();
    ds
}

/// Temperature and geopotential for 2020 at 900 hPa.
fn write_raw_grids(layout: &DataLayout) {
    let raw = layout.raw_dir();
    save_dataset(&raw_grid("t", 290.0), &raw.join(encode("temperature", 2020, 900))).unwrap();
    save_dataset(
        &raw_grid("z", 9000.0 * 9.80665),
        &raw.join(encode("geopotential", 2020, 900)),
    )
    .unwrap();
    // not a grid file
    fs::write(raw.join("notes.txt"), "downloaded by hand").unwrap();
}

fn run_for(layout: &DataLayout, platform: Platform) -> DataFrame {
    Unifier::new(layout).unify().unwrap();
    Editor::new(layout).edit_location(platform.symbol()).unwrap();
    let destination = Converter::new(layout, 200)
        .convert_location(platform.name())
        .unwrap();
    scan_partitions(&destination).unwrap().collect().unwrap()
}

fn part_bytes(directory: &Path) -> Vec<(String, Vec<u8>)> {
    let mut parts: Vec<(String, Vec<u8>)> = fs::read_dir(directory)
        .unwrap()
        .map(|entry| {
            let entry = entry.unwrap();
            (
                entry.file_name().to_string_lossy().into_owned(),
                fs::read(entry.path()).unwrap(),
            )
        })
        .collect();
    parts.sort();
    parts
}

#[test]
fn test_temperature_and_geopotential_to_table() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    write_raw_grids(&layout);

    let frame = run_for(&layout, Platform::Namorado2);
    let heights = target_heights();

    assert_eq!(frame.height(), TIME_STEPS * heights.len());
    let names: Vec<String> = frame
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(names, CANONICAL_ORDER.map(String::from).to_vec());

    let years = frame.column(YEAR).unwrap().i64().unwrap();
    assert!(years.into_no_null_iter().all(|year| year == 2020));

    let utc = frame.column(UTC_TIME).unwrap().cast(&DataType::Int64).unwrap();
    let utc: Vec<i64> = utc.i64().unwrap().into_no_null_iter().collect();
    let h: Vec<f64> = frame
        .column(HEIGHT)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    let mut per_time: HashMap<i64, Vec<f64>> = HashMap::new();
    for (time, height) in utc.iter().zip(&h) {
        per_time.entry(*time).or_default().push(*height);
    }
    assert_eq!(per_time.len(), TIME_STEPS);
    for (_, mut seen) in per_time {
        seen.sort_by(f64::total_cmp);
        assert_eq!(seen, heights);
    }

    let kelvin = frame.column(TEMPERATURE_K).unwrap().f64().unwrap();
    assert!(kelvin.into_no_null_iter().all(|t| (t - 290.0).abs() < 1e-9));
    let celsius = frame.column(TEMPERATURE_C).unwrap().f64().unwrap();
    assert!(celsius.into_no_null_iter().all(|t| (t - 16.85).abs() < 1e-9));
}

#[test]
fn test_rerun_produces_identical_parquet() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    write_raw_grids(&layout);

    run_for(&layout, Platform::Vermelho1);
    let first = part_bytes(&layout.platform_frame_dir(Platform::Vermelho1));
    run_for(&layout, Platform::Vermelho1);
    let second = part_bytes(&layout.platform_frame_dir(Platform::Vermelho1));

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn test_full_pipeline_and_profile_queries() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    write_raw_grids(&layout);

    let report = Pipeline::builder()
        .layout(layout.clone())
        .failure_policy(FailurePolicy::ContinueOnError)
        .time_steps_per_partition(4)
        .build()
        .run_full_pipeline()
        .unwrap();
    assert!(report.is_complete());
    assert_eq!(report.edited.len(), Platform::ALL.len());
    assert_eq!(report.converted.len(), Platform::ALL.len());

    // six time steps in partitions of four
    let parts = part_bytes(&layout.platform_frame_dir(Platform::Petrobras26));
    assert_eq!(parts.len(), 2);

    let profile = ProfileLazyFrame::read(&layout, "p2").unwrap();
    // 2020-06-01 UTC is still the end of May in Brasília
    let autumn = profile
        .get_seasons(&[Season::Autumn])
        .get_heights(&[130.0])
        .frame
        .collect()
        .unwrap();
    assert_eq!(autumn.height(), TIME_STEPS);
    let winter = profile.get_seasons(&[Season::Winter]).frame.collect().unwrap();
    assert_eq!(winter.height(), 0);
}

#[test]
fn test_unknown_location_is_rejected() {
    let dir = tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    write_raw_grids(&layout);
    Unifier::new(&layout).unify().unwrap();

    let err = Editor::new(&layout)
        .edit_location("not_a_platform")
        .unwrap_err();
    assert!(err.to_string().contains("not_a_platform"));
}
