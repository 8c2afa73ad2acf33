//! Pipeline-specific error types.

use crate::pipeline::filter::FilterKind;
use crate::pipeline::id::FilterId;
use crate::pipeline::port::PortDirection;
use crate::types::MeasurementId;
use thiserror::Error;

/// Errors that can occur while assembling or running a pipeline.
///
/// Everything except [`PipelineError::Protocol`], [`PipelineError::Io`] and
/// [`PipelineError::ThreadPanicked`] is raised during assembly, before any
/// filter thread starts.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Filter '{filter}' ({kind}) accepts at most {limit} {direction} connection(s)")]
    Cardinality {
        filter: String,
        kind: FilterKind,
        direction: PortDirection,
        limit: usize,
    },

    #[error("'{producer}' is already connected to '{consumer}'")]
    DuplicateConnection { producer: String, consumer: String },

    #[error("Filter '{filter}' requires {id} but its stream config has no length for it")]
    UnknownMeasurement { filter: String, id: MeasurementId },

    #[error("Filter '{filter}' ({kind}) has {connected} of {required} {direction} port(s) connected")]
    IncompleteWiring {
        filter: String,
        kind: FilterKind,
        direction: PortDirection,
        connected: usize,
        required: usize,
    },

    #[error("Cycle detected in pipeline graph")]
    CycleDetected,

    #[error("Unknown filter {0}")]
    UnknownFilter(FilterId),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Filter thread '{0}' panicked")]
    ThreadPanicked(String),
}

impl PipelineError {
    /// Whether this error is raised while wiring, before any data flows.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration(_)
                | PipelineError::Cardinality { .. }
                | PipelineError::DuplicateConnection { .. }
                | PipelineError::UnknownMeasurement { .. }
                | PipelineError::IncompleteWiring { .. }
                | PipelineError::CycleDetected
                | PipelineError::UnknownFilter(_)
        )
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
