//! Per-timestep field accumulator.
//!
//! A [`DataFrame`] collects the fields of one logical timestep as records
//! arrive one at a time. Its layout fixes which ids it accepts and the order
//! they are written back out in; it is complete once every layout field is
//! populated.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::record::{bytes_to_f64, bytes_to_i64, f64_to_bytes, Record};
use crate::types::{MeasurementId, MEASUREMENT_COUNT};

/// Ordered set of ids a frame collects.
pub type FrameLayout = &'static [MeasurementId];

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    layout: FrameLayout,
    fields: [Option<Vec<u8>>; MEASUREMENT_COUNT],
}

impl DataFrame {
    pub fn new(layout: FrameLayout) -> Self {
        Self {
            layout,
            fields: Default::default(),
        }
    }

    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    pub fn accepts(&self, id: MeasurementId) -> bool {
        self.layout.contains(&id)
    }

    /// Store a record's payload. A repeated id overwrites the earlier value.
    ///
    /// Ids outside the layout are a protocol error: upstream should have
    /// dropped them.
    pub fn insert(&mut self, record: Record) -> PipelineResult<()> {
        if !self.accepts(record.id) {
            return Err(PipelineError::Protocol(format!(
                "unexpected {} in a frame of {:?}",
                record.id, self.layout
            )));
        }
        let slot = &mut self.fields[record.id.index()];
        if slot.is_some() {
            tracing::trace!(id = %record.id, "Overwriting field in incomplete frame");
        }
        *slot = Some(record.payload);
        Ok(())
    }

    pub fn get(&self, id: MeasurementId) -> Option<&[u8]> {
        self.fields[id.index()].as_deref()
    }

    pub fn set(&mut self, id: MeasurementId, payload: Vec<u8>) {
        self.fields[id.index()] = Some(payload);
    }

    pub fn is_empty(&self) -> bool {
        self.layout.iter().all(|id| self.fields[id.index()].is_none())
    }

    pub fn is_complete(&self) -> bool {
        self.layout.iter().all(|id| self.fields[id.index()].is_some())
    }

    pub fn f64(&self, id: MeasurementId) -> PipelineResult<f64> {
        let bytes = self.require(id)?;
        bytes_to_f64(bytes)
            .ok_or_else(|| PipelineError::Protocol(format!("{} is {} bytes, expected an 8-byte f64", id, bytes.len())))
    }

    pub fn i64(&self, id: MeasurementId) -> PipelineResult<i64> {
        let bytes = self.require(id)?;
        bytes_to_i64(bytes)
            .ok_or_else(|| PipelineError::Protocol(format!("{} is {} bytes, expected an integer", id, bytes.len())))
    }

    pub fn set_f64(&mut self, id: MeasurementId, value: f64) {
        self.set(id, f64_to_bytes(value).to_vec());
    }

    /// Populated fields as records, in layout order.
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.layout.iter().filter_map(move |&id| {
            self.fields[id.index()]
                .as_ref()
                .map(|payload| Record::new(id, payload.clone()))
        })
    }

    pub fn clear(&mut self) {
        self.fields = Default::default();
    }

    fn require(&self, id: MeasurementId) -> PipelineResult<&[u8]> {
        self.get(id)
            .ok_or_else(|| PipelineError::Protocol(format!("frame has no {} yet", id)))
    }
}
