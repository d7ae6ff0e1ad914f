//! The end-to-end driver: unify the raw grids, edit every platform, then
//! convert every platform to its parquet table.

use crate::config::{DataLayout, FailurePolicy, PipelineConfig, DEFAULT_TIME_STEPS_PER_PARTITION};
use crate::edit::editor::Editor;
use crate::error::PipelineError;
use crate::locations::platform::Platform;
use crate::tabular::converter::Converter;
use crate::unify::unifier::Unifier;
use bon::bon;
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Which step of a location's processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Edit,
    Convert,
}

/// A location that could not be processed under
/// [`FailurePolicy::ContinueOnError`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFailure {
    pub location: String,
    pub step: PipelineStep,
    pub error: String,
}

/// What a full run produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PipelineReport {
    pub unified: PathBuf,
    pub edited: Vec<PathBuf>,
    pub converted: Vec<PathBuf>,
    pub failures: Vec<LocationFailure>,
}

impl PipelineReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs the unifier, the editor and the converter in sequence.
///
/// ```no_run
/// use era5_profiles::{DataLayout, FailurePolicy, Pipeline};
///
/// let pipeline = Pipeline::builder()
///     .layout(DataLayout::new("/srv/era5"))
///     .failure_policy(FailurePolicy::ContinueOnError)
///     .build();
/// let report = pipeline.run_full_pipeline()?;
/// println!("{}", serde_json::to_string_pretty(&report)?);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Pipeline {
    layout: DataLayout,
    failure_policy: FailurePolicy,
    time_steps_per_partition: usize,
}

#[bon]
impl Pipeline {
    /// Creates a pipeline over `layout`.
    ///
    /// # Optional Builder Methods
    ///
    /// * `.failure_policy(FailurePolicy)`: defaults to [`FailurePolicy::FailFast`].
    /// * `.time_steps_per_partition(usize)`: time steps per parquet file,
    ///   defaults to [`DEFAULT_TIME_STEPS_PER_PARTITION`]. Zero is rejected when
    ///   the converter runs.
    #[builder]
    pub fn new(
        layout: DataLayout,
        failure_policy: Option<FailurePolicy>,
        time_steps_per_partition: Option<usize>,
    ) -> Self {
        Self {
            layout,
            failure_policy: failure_policy.unwrap_or_default(),
            time_steps_per_partition: time_steps_per_partition
                .unwrap_or(DEFAULT_TIME_STEPS_PER_PARTITION),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self::builder()
            .layout(config.layout()?)
            .failure_policy(config.failure_policy)
            .time_steps_per_partition(config.time_steps_per_partition)
            .build())
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Unify, then edit every platform, then convert every platform.
    ///
    /// Under [`FailurePolicy::FailFast`] the first error aborts the run.
    /// Under [`FailurePolicy::ContinueOnError`] a failing platform is recorded
    /// in the report and skipped by later steps; unification errors always
    /// abort. Under either policy the outputs a failed platform left from an
    /// earlier run are deleted, so readers never pick up stale tables.
    pub fn run_full_pipeline(&self) -> Result<PipelineReport, PipelineError> {
        let unifier = Unifier::new(&self.layout);
        unifier.unify()?;

        let editor = Editor::new(&self.layout);
        let unified = editor.load_unified()?;
        let mut report = PipelineReport {
            unified: unifier.unified_path().to_path_buf(),
            ..Default::default()
        };

        let total = Platform::ALL.len();
        let mut edited_platforms = Vec::with_capacity(total);
        for (i, platform) in Platform::ALL.into_iter().enumerate() {
            match editor.edit_platform(&unified, platform) {
                Ok(path) => {
                    report.edited.push(path);
                    edited_platforms.push(platform);
                }
                Err(e) => self.record(&mut report, platform, PipelineStep::Edit, e.into())?,
            }
            info!("Edited {} ({}/{})", platform, i + 1, total);
        }

        let converter = Converter::new(&self.layout, self.time_steps_per_partition);
        let to_convert = edited_platforms.len();
        for (i, platform) in edited_platforms.into_iter().enumerate() {
            match converter.convert_platform(platform) {
                Ok(path) => report.converted.push(path),
                Err(e) => self.record(&mut report, platform, PipelineStep::Convert, e.into())?,
            }
            info!("Converted {} ({}/{})", platform, i + 1, to_convert);
        }

        info!(
            "Pipeline finished: {} edited, {} converted, {} failed",
            report.edited.len(),
            report.converted.len(),
            report.failures.len()
        );
        Ok(report)
    }

    fn record(
        &self,
        report: &mut PipelineReport,
        platform: Platform,
        step: PipelineStep,
        error: PipelineError,
    ) -> Result<(), PipelineError> {
        self.discard_outputs(platform, step);
        match self.failure_policy {
            FailurePolicy::FailFast => Err(error),
            FailurePolicy::ContinueOnError => {
                warn!("{:?} failed for {}: {}", step, platform, error);
                report.failures.push(LocationFailure {
                    location: platform.name().to_string(),
                    step,
                    error: error.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Removes what earlier runs produced for `platform` from `step` onwards.
    fn discard_outputs(&self, platform: Platform, step: PipelineStep) {
        if step == PipelineStep::Edit {
            let dataset = self.layout.platform_dataset_path(platform);
            report_removal(&dataset, fs::remove_file(&dataset));
        }
        let frames = self.layout.platform_frame_dir(platform);
        report_removal(&frames, fs::remove_dir_all(&frames));
    }
}

fn report_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => info!("Removed stale output {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove stale output {}: {}", path.display(), e),
    }
}
