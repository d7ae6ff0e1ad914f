use era5_profiles::{
    DataLayout, FailurePolicy, Pipeline, PipelineError, PipelineConfig, ProfileLazyFrame, Season,
};
use std::env;
use std::path::Path;

/// Runs the whole pipeline over `$ERA5_PROFILES_DATA_DIR` (or the platform
/// data directory), optionally configured by a JSON file given as the first
/// argument, then prints a slice of one platform's table.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    configure_polars_display();

    let pipeline = match env::args().nth(1) {
        Some(path) => Pipeline::from_config(&PipelineConfig::from_json_file(Path::new(&path))?)?,
        None => Pipeline::builder()
            .layout(DataLayout::from_env().map_err(PipelineError::from)?)
            .failure_policy(FailurePolicy::ContinueOnError)
            .build(),
    };

    let report = pipeline.run_full_pipeline()?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    let winter_at_200m = ProfileLazyFrame::read(pipeline.layout(), "p1")?
        .get_seasons(&[Season::Winter])
        .get_heights(&[200.0])
        .frame
        .collect()?;
    println!("{:#?}", winter_at_200m);

    Ok(())
}

fn configure_polars_display() {
    // show every column
    env::set_var("POLARS_FMT_MAX_COLS", "-1");
    // show 20 rows
    env::set_var("POLARS_FMT_MAX_ROWS", "20");
}
