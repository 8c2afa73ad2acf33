//! Configuration module for telepipe
//!
//! Two layers:
//! - [`StreamConfig`] - the immutable length table each filter decodes with,
//!   built in code by the plumbers.
//! - [`PipelineConfig`] - deployment settings loaded from a TOML file:
//!   thresholds, formats, logging and file paths.
//!
//! # Example
//!
//! ```toml
//! [pipeline]
//! channel_capacity = 64
//!
//! [wild_point]
//! threshold_psi = 10.0
//! negate_corrected = true
//!
//! [altitude]
//! threshold_feet = 10000.0
//!
//! [format]
//! time_format = "%Y:%d:%H:%M:%S"
//!
//! [io]
//! data_dir = "/var/telemetry"
//! flight_data = "FlightData.dat"
//! ```

pub mod settings;
pub mod stream;

pub use settings::*;
pub use stream::{StreamConfig, StreamConfigBuilder, DEFAULT_FIELD_LENGTH, DEFAULT_ID_WIDTH};

use crate::error::{Result, TelepipeError};
use crate::pipeline::filters::TimeFormatter;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Deployment configuration, one TOML table per section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub pipeline: RuntimeSettings,
    pub wild_point: WildPointSettings,
    pub altitude: AltitudeSettings,
    pub format: FormatSettings,
    pub logging: LoggingSettings,
    pub io: IoSettings,
}

impl PipelineConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TelepipeError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml(&content).map_err(|e| e.with_context(format!("{:?}", path)))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load a configuration file, returning defaults if any error occurs
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Using default configuration: {}", e);
            Self::default()
        })
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| TelepipeError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| TelepipeError::Serialization(format!("Failed to serialize config: {}", e)))
    }

    /// Save the configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    TelepipeError::Config(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| {
            TelepipeError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Reject values no pipeline could run with
    pub fn validate(&self) -> Result<()> {
        if !(self.wild_point.threshold_psi.is_finite() && self.wild_point.threshold_psi >= 0.0) {
            return Err(TelepipeError::Config(format!(
                "wild_point.threshold_psi must be a non-negative number, got {}",
                self.wild_point.threshold_psi
            )));
        }
        if !self.altitude.threshold_feet.is_finite() {
            return Err(TelepipeError::Config(format!(
                "altitude.threshold_feet must be finite, got {}",
                self.altitude.threshold_feet
            )));
        }
        TimeFormatter::new(self.format.time_format.as_str())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = PipelineConfig::from_toml(
            r#"
            [wild_point]
            threshold_psi = 2.5

            [io]
            data_dir = "/tmp/flight"
            "#,
        )
        .unwrap();
        assert_eq!(config.wild_point.threshold_psi, 2.5);
        assert!(config.wild_point.negate_corrected);
        assert_eq!(config.io.output_a, std::path::PathBuf::from("OutputA.dat"));
        assert_eq!(
            config.io.resolve(&config.io.output_a),
            std::path::PathBuf::from("/tmp/flight/OutputA.dat")
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(PipelineConfig::from_toml("[wild_point]\nthreshold_psi = -1.0").is_err());
        assert!(PipelineConfig::from_toml("[format]\ntime_format = \"%Q\"").is_err());
        assert!(PipelineConfig::from_toml("[pipeline]\nchannel_capacity = \"lots\"").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("telepipe.toml");

        let mut config = PipelineConfig::default();
        config.pipeline.channel_capacity = 8;
        config.altitude.threshold_feet = 5_000.0;
        config.save(&path).unwrap();

        let loaded = PipelineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("none.toml");
        assert!(PipelineConfig::load(&missing).is_err());
        assert_eq!(PipelineConfig::load_or_default(&missing), PipelineConfig::default());
    }
}
