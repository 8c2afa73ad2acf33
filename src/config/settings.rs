//! Settings sections of the pipeline configuration file
//!
//! Each struct maps to one TOML table of [`super::PipelineConfig`]. Every
//! field has a default, so a partial file (or none at all) reproduces the
//! deployed systems unchanged.
//!
//! # Main Types
//!
//! - [`RuntimeSettings`] - `[pipeline]`: channel sizing
//! - [`WildPointSettings`] - `[wild_point]`: outlier threshold and correction hook
//! - [`AltitudeSettings`] - `[altitude]`: split threshold
//! - [`FormatSettings`] - `[format]`: text rendering
//! - [`LoggingSettings`] - `[logging]`: optional log file directory
//! - [`IoSettings`] - `[io]`: input and output files per system

use crate::pipeline::filters::altitude::DEFAULT_ALTITUDE_THRESHOLD_FEET;
use crate::pipeline::filters::convert::DEFAULT_TIME_FORMAT;
use crate::pipeline::filters::wild_point::DEFAULT_THRESHOLD_PSI;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Engine settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Chunks buffered per connection; 0 = unbounded
    pub channel_capacity: usize,
}

/// Wild-point filter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WildPointSettings {
    /// Largest accepted jump between consecutive valid readings (PSI)
    pub threshold_psi: f64,

    /// Write corrected pressures as negative values (system B only)
    pub negate_corrected: bool,
}

impl Default for WildPointSettings {
    fn default() -> Self {
        Self {
            threshold_psi: DEFAULT_THRESHOLD_PSI,
            negate_corrected: true,
        }
    }
}

/// Altitude splitter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AltitudeSettings {
    /// Frames strictly below this altitude go to the low branch
    pub threshold_feet: f64,
}

impl Default for AltitudeSettings {
    fn default() -> Self {
        Self {
            threshold_feet: DEFAULT_ALTITUDE_THRESHOLD_FEET,
        }
    }
}

/// Text formatting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSettings {
    /// strftime pattern for the time column, rendered in UTC
    pub time_format: String,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Write a daily rolling log file here in addition to stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

/// Input and output files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoSettings {
    /// Relative paths below are resolved against this directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Input of systems A and B
    pub flight_data: PathBuf,

    /// System A output
    pub output_a: PathBuf,

    /// System B valid output
    pub output_b: PathBuf,

    /// System B wild points
    pub wild_points: PathBuf,

    /// System C first input
    pub subset_a: PathBuf,

    /// System C second input
    pub subset_b: PathBuf,

    /// System C frames below the altitude threshold
    pub below_threshold: PathBuf,

    /// System C corrected pressure of frames above the threshold
    pub pressure_wild_points: PathBuf,
}

impl Default for IoSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            flight_data: PathBuf::from("FlightData.dat"),
            output_a: PathBuf::from("OutputA.dat"),
            output_b: PathBuf::from("OutputB.dat"),
            wild_points: PathBuf::from("WildPoints.dat"),
            subset_a: PathBuf::from("SubSetA.dat"),
            subset_b: PathBuf::from("SubSetB.dat"),
            below_threshold: PathBuf::from("LessThan10K.dat"),
            pressure_wild_points: PathBuf::from("PressureWildPoints.dat"),
        }
    }
}

impl IoSettings {
    /// Resolve `path` against `data_dir` unless it is absolute.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.data_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
