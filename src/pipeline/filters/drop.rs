//! FieldDropFilter: removes measurements by id.
//!
//! Every record whose id is in the drop set is discarded; everything else
//! passes through unchanged.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::filter::Transform;
use crate::types::{MeasurementId, MEASUREMENT_COUNT};

#[derive(Debug, Clone, Default)]
pub struct FieldDropFilter {
    dropped: [bool; MEASUREMENT_COUNT],
}

impl FieldDropFilter {
    /// Passthrough: drops nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the listed ids.
    pub fn dropping(ids: &[MeasurementId]) -> Self {
        let mut filter = Self::new();
        for &id in ids {
            filter.set_dropped(id, true);
        }
        filter
    }

    /// Drop everything except the listed ids.
    pub fn keeping(ids: &[MeasurementId]) -> Self {
        let mut filter = Self {
            dropped: [true; MEASUREMENT_COUNT],
        };
        for &id in ids {
            filter.set_dropped(id, false);
        }
        filter
    }

    pub fn set_dropped(&mut self, id: MeasurementId, dropped: bool) {
        self.dropped[id.index()] = dropped;
    }

    pub fn is_dropped(&self, id: MeasurementId) -> bool {
        self.dropped[id.index()]
    }
}

impl Transform for FieldDropFilter {
    fn transform(&mut self, id: MeasurementId, payload: Vec<u8>) -> PipelineResult<Vec<u8>> {
        if self.is_dropped(id) {
            return Ok(Vec::new());
        }
        Ok(payload)
    }
}
