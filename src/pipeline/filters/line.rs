//! LineFormatter: turns formatted fields into text lines.
//!
//! Records are consumed, not forwarded. Once every selected field of a step
//! has been seen the filter emits one raw line: the fields' text, trimmed of
//! padding, tab-separated in the fixed column order and terminated by `\n`.
//! Ids that are not selected are discarded.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::filter::Transform;
use crate::types::{MeasurementId, MEASUREMENT_COUNT};

/// Column order of every emitted line.
pub const COLUMN_ORDER: [MeasurementId; MEASUREMENT_COUNT] = [
    MeasurementId::Time,
    MeasurementId::Velocity,
    MeasurementId::Temperature,
    MeasurementId::Altitude,
    MeasurementId::Pressure,
    MeasurementId::Attitude,
];

#[derive(Debug, Clone)]
pub struct LineFormatter {
    columns: Vec<MeasurementId>,
    cached: [Option<String>; MEASUREMENT_COUNT],
    pending: Option<Vec<u8>>,
    lines: u64,
}

impl LineFormatter {
    /// Emit lines made of `fields`, reordered into [`COLUMN_ORDER`].
    pub fn new(fields: &[MeasurementId]) -> Self {
        let columns = COLUMN_ORDER
            .into_iter()
            .filter(|id| fields.contains(id))
            .collect();
        Self {
            columns,
            cached: Default::default(),
            pending: None,
            lines: 0,
        }
    }

    pub fn columns(&self) -> &[MeasurementId] {
        &self.columns
    }

    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    fn complete(&self) -> bool {
        self.columns.iter().all(|id| self.cached[id.index()].is_some())
    }

    fn render(&mut self) -> Vec<u8> {
        let mut cached = std::mem::take(&mut self.cached);
        let fields: Vec<String> = self
            .columns
            .iter()
            .map(|id| cached[id.index()].take().unwrap_or_default())
            .collect();
        let mut line = fields.join("\t");
        line.push('\n');
        line.into_bytes()
    }
}

/// Text content of a fixed-width field.
pub fn trim_field(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

impl Transform for LineFormatter {
    fn required_ids(&self) -> &[MeasurementId] {
        &self.columns
    }

    fn transform(&mut self, id: MeasurementId, payload: Vec<u8>) -> PipelineResult<Vec<u8>> {
        if !self.columns.contains(&id) {
            tracing::trace!(id = %id, "Field not part of the line, discarding");
            return Ok(Vec::new());
        }
        self.cached[id.index()] = Some(trim_field(&payload));
        if self.complete() {
            let line = self.render();
            self.lines += 1;
            self.pending = Some(line);
        }
        Ok(Vec::new())
    }

    fn take_raw_output(&mut self) -> Option<Vec<u8>> {
        self.pending.take()
    }
}
