//! Stream length tables.
//!
//! A [`StreamConfig`] tells a filter how many bytes follow each measurement
//! id on its input. Lengths change as records pass through formatting
//! filters (a raw epoch time is 8 bytes, the formatted date 16), so every
//! filter is handed the table valid at its own position in the pipeline.
//!
//! Tables are built once with [`StreamConfigBuilder`] and never mutated
//! afterwards; filters share them behind an `Arc`.
//!
//! ```
//! use telepipe::config::StreamConfigBuilder;
//! use telepipe::types::MeasurementId;
//!
//! // config for a filter sitting after the time formatter
//! let config = StreamConfigBuilder::default_preset()
//!     .with_length(MeasurementId::Time, 16)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.length_for(MeasurementId::Time), Some(16));
//! assert_eq!(config.length_for(MeasurementId::Pressure), Some(8));
//! ```

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::types::{MeasurementId, MEASUREMENT_COUNT};

/// Default width of the id field in bytes.
pub const DEFAULT_ID_WIDTH: usize = 4;

/// Default payload length of a raw measurement in bytes.
pub const DEFAULT_FIELD_LENGTH: usize = 8;

/// Largest supported id width.
pub const MAX_ID_WIDTH: usize = 8;

/// Immutable mapping from measurement id to payload length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    id_width: usize,
    lengths: [Option<usize>; MEASUREMENT_COUNT],
}

impl StreamConfig {
    #[inline]
    pub fn id_width(&self) -> usize {
        self.id_width
    }

    /// Payload length for `id`, or `None` if the id is not expected here.
    #[inline]
    pub fn length_for(&self, id: MeasurementId) -> Option<usize> {
        self.lengths[id.index()]
    }

    #[inline]
    pub fn contains(&self, id: MeasurementId) -> bool {
        self.lengths[id.index()].is_some()
    }

    /// Start a builder from this table, e.g. to describe a downstream position.
    pub fn to_builder(&self) -> StreamConfigBuilder {
        StreamConfigBuilder {
            id_width: self.id_width,
            lengths: self.lengths,
        }
    }
}

impl Default for StreamConfig {
    /// 4-byte ids, 8 bytes for every field.
    fn default() -> Self {
        Self {
            id_width: DEFAULT_ID_WIDTH,
            lengths: [Some(DEFAULT_FIELD_LENGTH); MEASUREMENT_COUNT],
        }
    }
}

/// Fluent builder for [`StreamConfig`].
#[derive(Debug, Clone)]
pub struct StreamConfigBuilder {
    id_width: usize,
    lengths: [Option<usize>; MEASUREMENT_COUNT],
}

impl StreamConfigBuilder {
    /// Empty table with the default id width; every field must be declared.
    pub fn new() -> Self {
        Self {
            id_width: DEFAULT_ID_WIDTH,
            lengths: [None; MEASUREMENT_COUNT],
        }
    }

    /// The default preset: 4-byte ids, 8-byte fields.
    pub fn default_preset() -> Self {
        StreamConfig::default().to_builder()
    }

    pub fn with_id_width(mut self, width: usize) -> Self {
        self.id_width = width;
        self
    }

    pub fn with_length(mut self, id: MeasurementId, length: usize) -> Self {
        self.lengths[id.index()] = Some(length);
        self
    }

    /// Remove `id` from the table; records carrying it become protocol errors.
    pub fn without(mut self, id: MeasurementId) -> Self {
        self.lengths[id.index()] = None;
        self
    }

    pub fn build(self) -> PipelineResult<StreamConfig> {
        if self.id_width == 0 || self.id_width > MAX_ID_WIDTH {
            return Err(PipelineError::Configuration(format!(
                "id width must be between 1 and {} bytes, got {}",
                MAX_ID_WIDTH, self.id_width
            )));
        }
        for id in MeasurementId::ALL {
            if self.lengths[id.index()] == Some(0) {
                return Err(PipelineError::Configuration(format!(
                    "{} declared with a zero-length payload",
                    id
                )));
            }
        }
        Ok(StreamConfig {
            id_width: self.id_width,
            lengths: self.lengths,
        })
    }
}

impl Default for StreamConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
