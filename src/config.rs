//! Where the pipeline reads and writes, and how it behaves on failure.

use crate::locations::Platform;
use crate::types::lat_lon::LatLon;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the default data directory.
pub const DATA_DIR_ENV: &str = "ERA5_PROFILES_DATA_DIR";
const DATA_DIR_NAME: &str = "era5_profiles";
const UNIFIED_FILE_NAME: &str = "unified.nc";
pub const DEFAULT_TIME_STEPS_PER_PARTITION: usize = 200;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to determine the data directory; set ERA5_PROFILES_DATA_DIR")]
    DataDirResolution,

    #[error("Failed to read configuration file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse configuration file '{0}'")]
    Parse(PathBuf, #[source] serde_json::Error),

    #[error("Partitions must hold at least one time step")]
    EmptyPartition,
}

/// Paths of every artefact, computed from one root directory.
///
/// ```text
/// <root>/datasets/raw/                         raw grid files
/// <root>/datasets/unified/unified.nc
/// <root>/datasets/points/platforms/<file name>
/// <root>/datasets/points/other_points/point_<lat>_<lon>.nc
/// <root>/frames/points/platforms/<folder name>/part.<n>.parquet
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `ERA5_PROFILES_DATA_DIR`, falling back to the user data
    /// directory (`~/.local/share/era5_profiles` on Linux).
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
            return Ok(Self::new(dir));
        }
        dirs::data_dir()
            .map(|dir| Self::new(dir.join(DATA_DIR_NAME)))
            .ok_or(ConfigError::DataDirResolution)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn datasets_dir(&self) -> PathBuf {
        self.root.join("datasets")
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.datasets_dir().join("raw")
    }

    pub fn unified_path(&self) -> PathBuf {
        self.datasets_dir().join("unified").join(UNIFIED_FILE_NAME)
    }

    pub fn platform_datasets_dir(&self) -> PathBuf {
        self.datasets_dir().join("points").join("platforms")
    }

    pub fn platform_dataset_path(&self, platform: Platform) -> PathBuf {
        self.platform_datasets_dir().join(platform.file_name())
    }

    pub fn other_points_dir(&self) -> PathBuf {
        self.datasets_dir().join("points").join("other_points")
    }

    pub fn other_point_path(&self, point: LatLon) -> PathBuf {
        self.other_points_dir()
            .join(format!("point_{:.4}_{:.4}.nc", point.0, point.1))
    }

    pub fn platform_frames_dir(&self) -> PathBuf {
        self.root.join("frames").join("points").join("platforms")
    }

    pub fn platform_frame_dir(&self, platform: Platform) -> PathBuf {
        self.platform_frames_dir().join(platform.folder_name())
    }
}

/// What the driver does when one location fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first error.
    #[default]
    FailFast,
    /// Record the failure and carry on with the next location.
    ContinueOnError,
}

fn default_time_steps_per_partition() -> usize {
    DEFAULT_TIME_STEPS_PER_PARTITION
}

/// Pipeline settings as stored in a JSON file.
///
/// ```json
/// { "data_dir": "/srv/era5", "failure_policy": "continue_on_error", "time_steps_per_partition": 100 }
/// ```
///
/// Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default = "default_time_steps_per_partition")]
    pub time_steps_per_partition: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            failure_policy: FailurePolicy::default(),
            time_steps_per_partition: DEFAULT_TIME_STEPS_PER_PARTITION,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: PipelineConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        if config.time_steps_per_partition == 0 {
            return Err(ConfigError::EmptyPartition);
        }
        Ok(config)
    }

    /// Layout rooted at `data_dir`, or at the environment default.
    pub fn layout(&self) -> Result<DataLayout, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(DataLayout::new(dir)),
            None => DataLayout::from_env(),
        }
    }
}
