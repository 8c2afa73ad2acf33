//! Wild-point detection with deferred extrapolation.
//!
//! A pressure reading is *valid* if it is a finite, non-negative number and,
//! when a last valid reading exists, the two differ by at most the threshold.
//! Anything else, NaN and infinities included, is *wild*. Wild frames are
//! emitted verbatim on the wild output (side one) and queued. The next valid
//! frame releases the queue onto the valid output (side two), each queued
//! frame corrected to the mean of the surrounding valid readings, and is then
//! emitted itself.
//!
//! ```text
//! pressure in : 5   200  -3   300  7
//! wild   (1)  :     200  -3   300
//! valid  (2)  : 5   6    6    6    7
//! ```
//!
//! The decision logic lives in [`WildPointState`], which works on frames
//! and can be driven without any ports.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::filter::{Router, SplitOutputs};
use crate::pipeline::frame::{DataFrame, FrameLayout};
use crate::pipeline::id::Side;
use crate::pipeline::record::Record;
use crate::types::MeasurementId;
use std::collections::VecDeque;

pub const DEFAULT_THRESHOLD_PSI: f64 = 10.0;

/// Output side for wild frames.
pub const WILD_SIDE: Side = Side::One;
/// Output side for valid and corrected frames.
pub const VALID_SIDE: Side = Side::Two;

/// Post-processing applied to corrected pressures only.
pub type CorrectionHook = fn(f64) -> f64;

/// `-|v|`, used by deployments that mark corrected readings as negative.
pub fn negate_magnitude(value: f64) -> f64 {
    -value.abs()
}

/// Fields collected per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildPointLayout {
    /// {time, pressure}
    PressureOnly,
    /// {time, temperature, altitude, pressure}
    Full,
}

impl WildPointLayout {
    pub fn fields(self) -> FrameLayout {
        match self {
            WildPointLayout::PressureOnly => &[MeasurementId::Time, MeasurementId::Pressure],
            WildPointLayout::Full => &[
                MeasurementId::Time,
                MeasurementId::Temperature,
                MeasurementId::Altitude,
                MeasurementId::Pressure,
            ],
        }
    }
}

/// A frame leaving the state machine and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    Wild(DataFrame),
    Valid(DataFrame),
}

impl Emission {
    pub fn side(&self) -> Side {
        match self {
            Emission::Wild(_) => WILD_SIDE,
            Emission::Valid(_) => VALID_SIDE,
        }
    }

    pub fn frame(&self) -> &DataFrame {
        match self {
            Emission::Wild(frame) | Emission::Valid(frame) => frame,
        }
    }
}

/// Backlog and last-valid bookkeeping.
#[derive(Debug, Clone)]
pub struct WildPointState {
    threshold: f64,
    last_valid: Option<f64>,
    backlog: VecDeque<DataFrame>,
    hook: Option<CorrectionHook>,
}

impl WildPointState {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            last_valid: None,
            backlog: VecDeque::new(),
            hook: None,
        }
    }

    pub fn with_correction_hook(mut self, hook: CorrectionHook) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn last_valid(&self) -> Option<f64> {
        self.last_valid
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Stated as a positive test so that NaN never passes a comparison.
    pub fn is_valid(&self, pressure: f64) -> bool {
        pressure.is_finite()
            && pressure >= 0.0
            && self
                .last_valid
                .map_or(true, |last| (pressure - last).abs() <= self.threshold)
    }

    pub fn is_wild(&self, pressure: f64) -> bool {
        !self.is_valid(pressure)
    }

    /// Classify one complete frame.
    pub fn push(&mut self, frame: DataFrame) -> PipelineResult<Vec<Emission>> {
        let pressure = frame.f64(MeasurementId::Pressure)?;
        if self.is_wild(pressure) {
            tracing::debug!(pressure, last_valid = ?self.last_valid, "Wild point");
            self.backlog.push_back(frame.clone());
            return Ok(vec![Emission::Wild(frame)]);
        }

        let correction = match self.last_valid {
            Some(last) => (pressure + last) / 2.0,
            None => pressure,
        };
        let mut out = self.release_backlog(correction);
        self.last_valid = Some(pressure);
        out.push(Emission::Valid(frame));
        Ok(out)
    }

    /// Flush the backlog at end-of-stream, corrected to the last valid reading.
    ///
    /// If no valid reading was ever seen there is nothing to extrapolate from
    /// and the queued frames are released uncorrected.
    pub fn finish(&mut self) -> Vec<Emission> {
        if self.backlog.is_empty() {
            return Vec::new();
        }
        match self.last_valid {
            Some(last) => self.release_backlog(last),
            None => {
                tracing::warn!(
                    frames = self.backlog.len(),
                    "No valid pressure in the whole stream, releasing wild frames uncorrected"
                );
                self.backlog.drain(..).map(Emission::Valid).collect()
            }
        }
    }

    fn release_backlog(&mut self, correction: f64) -> Vec<Emission> {
        let corrected = self.hook.map_or(correction, |hook| hook(correction));
        self.backlog
            .drain(..)
            .map(|mut frame| {
                frame.set_f64(MeasurementId::Pressure, corrected);
                Emission::Valid(frame)
            })
            .collect()
    }
}

/// Splitting filter wrapping [`WildPointState`].
#[derive(Debug, Clone)]
pub struct WildPointFilter {
    layout: WildPointLayout,
    state: WildPointState,
    frame: DataFrame,
}

impl WildPointFilter {
    pub fn new(layout: WildPointLayout, threshold: f64) -> Self {
        Self {
            layout,
            state: WildPointState::new(threshold),
            frame: DataFrame::new(layout.fields()),
        }
    }

    pub fn pressure_only(threshold: f64) -> Self {
        Self::new(WildPointLayout::PressureOnly, threshold)
    }

    pub fn full(threshold: f64) -> Self {
        Self::new(WildPointLayout::Full, threshold)
    }

    /// Write corrected pressures as `-|p|`.
    pub fn with_negated_corrections(mut self) -> Self {
        self.state = self.state.with_correction_hook(negate_magnitude);
        self
    }

    pub fn layout(&self) -> WildPointLayout {
        self.layout
    }

    fn emit(out: &mut SplitOutputs<'_>, emissions: Vec<Emission>) -> PipelineResult<()> {
        for emission in &emissions {
            out.write_frame(emission.side(), emission.frame())?;
        }
        Ok(())
    }
}

impl Router for WildPointFilter {
    fn required_ids(&self) -> &[MeasurementId] {
        self.layout.fields()
    }

    fn route(&mut self, record: Record, out: &mut SplitOutputs<'_>) -> PipelineResult<()> {
        self.frame.insert(record)?;
        if !self.frame.is_complete() {
            return Ok(());
        }
        let frame = std::mem::replace(&mut self.frame, DataFrame::new(self.layout.fields()));
        let emissions = self.state.push(frame)?;
        Self::emit(out, emissions)
    }

    fn on_end_of_stream(&mut self, out: &mut SplitOutputs<'_>) -> PipelineResult<()> {
        if !self.frame.is_empty() {
            tracing::warn!("Input ended inside a frame, dropping the partial frame");
            self.frame.clear();
        }
        let emissions = self.state.finish();
        Self::emit(out, emissions)
    }
}
