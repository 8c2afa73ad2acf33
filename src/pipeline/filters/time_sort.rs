//! TimeSortMerger: merges two time-ordered streams into one.
//!
//! Each side accumulates one {time, altitude, pressure} frame. When both
//! hold a complete frame, the one with the earlier time is emitted (ties go
//! to side one) and only that side is cleared. When one side ends, the other
//! side's cached frame is flushed as-is and the rest of that side is copied
//! through by the driver.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::filter::Combiner;
use crate::pipeline::frame::{DataFrame, FrameLayout};
use crate::pipeline::id::Side;
use crate::pipeline::record::Record;
use crate::types::MeasurementId;

const LAYOUT: FrameLayout = &[MeasurementId::Time, MeasurementId::Altitude, MeasurementId::Pressure];

#[derive(Debug, Clone)]
pub struct TimeSortMerger {
    frames: [DataFrame; 2],
}

impl TimeSortMerger {
    pub fn new() -> Self {
        Self {
            frames: [DataFrame::new(LAYOUT), DataFrame::new(LAYOUT)],
        }
    }

    /// Side whose frame goes out next. Both frames must be complete.
    pub fn earlier_side(&self) -> PipelineResult<Side> {
        let one = self.frames[Side::One.index()].i64(MeasurementId::Time)?;
        let two = self.frames[Side::Two.index()].i64(MeasurementId::Time)?;
        Ok(if one <= two { Side::One } else { Side::Two })
    }

    fn take_frame(&mut self, side: Side) -> Vec<Record> {
        let frame = &mut self.frames[side.index()];
        let records = frame.records().collect();
        frame.clear();
        records
    }
}

impl Default for TimeSortMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl Combiner for TimeSortMerger {
    fn required_ids(&self) -> &[MeasurementId] {
        LAYOUT
    }

    fn should_read(&self, side: Side) -> bool {
        !self.frames[side.index()].is_complete()
    }

    fn on_record(&mut self, side: Side, record: Record) -> PipelineResult<()> {
        self.frames[side.index()].insert(record)
    }

    fn is_complete(&self) -> bool {
        self.frames.iter().all(DataFrame::is_complete)
    }

    fn take_aggregated(&mut self) -> PipelineResult<Vec<Record>> {
        let side = self.earlier_side()?;
        Ok(self.take_frame(side))
    }

    fn on_end_of_stream(&mut self, ended: Side) -> PipelineResult<Vec<Record>> {
        if !self.frames[ended.index()].is_empty() {
            tracing::warn!(side = %ended, "Input ended inside a frame, dropping the partial frame");
            self.frames[ended.index()].clear();
        }
        Ok(self.take_frame(ended.other()))
    }
}
