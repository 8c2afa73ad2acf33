//! AltitudeSplitter: routes whole frames by altitude.
//!
//! Frames of {time, altitude, pressure} below the threshold go to output one,
//! all others to output two. Altitude is read as raw feet.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::filter::{Router, SplitOutputs};
use crate::pipeline::frame::{DataFrame, FrameLayout};
use crate::pipeline::id::Side;
use crate::pipeline::record::Record;
use crate::types::MeasurementId;

pub const DEFAULT_ALTITUDE_THRESHOLD_FEET: f64 = 10_000.0;

const LAYOUT: FrameLayout = &[MeasurementId::Time, MeasurementId::Altitude, MeasurementId::Pressure];

#[derive(Debug, Clone)]
pub struct AltitudeSplitter {
    threshold_feet: f64,
    frame: DataFrame,
}

impl AltitudeSplitter {
    pub fn new(threshold_feet: f64) -> Self {
        Self {
            threshold_feet,
            frame: DataFrame::new(LAYOUT),
        }
    }

    pub fn threshold_feet(&self) -> f64 {
        self.threshold_feet
    }

    /// Output side for a frame at `altitude_feet`.
    pub fn side_for(&self, altitude_feet: f64) -> Side {
        if altitude_feet < self.threshold_feet {
            Side::One
        } else {
            Side::Two
        }
    }
}

impl Default for AltitudeSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_ALTITUDE_THRESHOLD_FEET)
    }
}

impl Router for AltitudeSplitter {
    fn required_ids(&self) -> &[MeasurementId] {
        LAYOUT
    }

    fn route(&mut self, record: Record, out: &mut SplitOutputs<'_>) -> PipelineResult<()> {
        self.frame.insert(record)?;
        if !self.frame.is_complete() {
            return Ok(());
        }
        let side = self.side_for(self.frame.f64(MeasurementId::Altitude)?);
        out.write_frame(side, &self.frame)?;
        self.frame.clear();
        Ok(())
    }

    fn on_end_of_stream(&mut self, _out: &mut SplitOutputs<'_>) -> PipelineResult<()> {
        if !self.frame.is_empty() {
            tracing::warn!("Input ended inside a frame, dropping the partial frame");
            self.frame.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::filters::test_support::route_all;

    fn frame(time: i64, altitude: f64) -> Vec<Record> {
        vec![
            Record::from_i64(MeasurementId::Time, time),
            Record::from_f64(MeasurementId::Altitude, altitude),
            Record::from_f64(MeasurementId::Pressure, 30.0),
        ]
    }

    #[test]
    fn test_routes_whole_frames() {
        let mut records = frame(1, 500.0);
        records.extend(frame(2, 20_000.0));
        records.extend(frame(3, 9_000.0));
        // partial trailing frame is dropped
        records.push(Record::from_i64(MeasurementId::Time, 4));

        let (below, above) = route_all(&mut AltitudeSplitter::default(), records);
        let mut expected_below = frame(1, 500.0);
        expected_below.extend(frame(3, 9_000.0));
        assert_eq!(below, expected_below);
        assert_eq!(above, frame(2, 20_000.0));
    }

    #[test]
    fn test_field_order_is_normalized() {
        let records = vec![
            Record::from_f64(MeasurementId::Pressure, 30.0),
            Record::from_f64(MeasurementId::Altitude, 100.0),
            Record::from_i64(MeasurementId::Time, 9),
        ];
        let (below, _) = route_all(&mut AltitudeSplitter::default(), records);
        assert_eq!(below, frame(9, 100.0));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let splitter = AltitudeSplitter::default();
        assert_eq!(splitter.side_for(9_999.9), Side::One);
        assert_eq!(splitter.side_for(10_000.0), Side::Two);
        assert_eq!(splitter.side_for(35_000.0), Side::Two);
    }
}
