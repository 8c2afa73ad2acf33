//! Stateless converting and formatting transforms.
//!
//! Each converter rewrites the payload of a single measurement id and passes
//! every other record through untouched. Output is fixed-width text: shorter
//! renderings are padded with NUL bytes, longer ones truncated, so the
//! downstream stream config can bind a constant length to the id.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::filter::Transform;
use crate::pipeline::record::{bytes_to_f64, bytes_to_i64};
use crate::types::MeasurementId;
use chrono::format::{Item, StrftimeItems};
use chrono::DateTime;
use std::fmt::Write;

/// Width of a formatted time field.
pub const TIME_WIDTH: usize = 16;
/// Width of a formatted temperature field (`#000.00000` plus sign).
pub const TEMPERATURE_WIDTH: usize = 10;
/// Width of a formatted altitude field (`#000000.00000` plus sign).
pub const ALTITUDE_WIDTH: usize = 13;
/// Width of a formatted pressure field (`#00.00000` plus sign).
pub const PRESSURE_WIDTH: usize = 9;

/// Default strftime pattern for formatted times.
pub const DEFAULT_TIME_FORMAT: &str = "%Y:%d:%H:%M:%S";

const FEET_PER_METER: f64 = 3.2808;

/// Copy `text` into exactly `width` bytes, NUL-padding or truncating.
pub fn fixed_width(text: &str, width: usize) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.resize(width, 0);
    bytes
}

/// Render `value` with at least `int_digits` integer digits (zero-padded)
/// and exactly `frac_digits` fraction digits.
///
/// `decimal_format(-5.2, 3, 5)` is `"-005.20000"`.
pub fn decimal_format(value: f64, int_digits: usize, frac_digits: usize) -> String {
    let width = int_digits + if frac_digits > 0 { frac_digits + 1 } else { 0 };
    let magnitude = format!("{:0width$.prec$}", value.abs(), width = width, prec = frac_digits);
    if value < 0.0 {
        format!("-{}", magnitude)
    } else {
        magnitude
    }
}

/// Epoch milliseconds (8-byte big-endian integer) to a formatted UTC time.
#[derive(Debug, Clone)]
pub struct TimeFormatter {
    format: String,
}

impl TimeFormatter {
    /// Fails if `format` is not a valid strftime pattern.
    pub fn new(format: impl Into<String>) -> PipelineResult<Self> {
        let format = format.into();
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(PipelineError::Configuration(format!(
                "invalid time format '{}'",
                format
            )));
        }
        Ok(Self { format })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn render(&self, epoch_ms: i64) -> PipelineResult<String> {
        let time = DateTime::from_timestamp_millis(epoch_ms).ok_or_else(|| {
            PipelineError::Protocol(format!("time {} ms is out of range", epoch_ms))
        })?;
        let mut out = String::new();
        write!(out, "{}", time.format(&self.format))
            .map_err(|_| PipelineError::Configuration(format!("cannot render time with '{}'", self.format)))?;
        Ok(out)
    }
}

impl Default for TimeFormatter {
    fn default() -> Self {
        Self {
            format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

impl Transform for TimeFormatter {
    fn required_ids(&self) -> &[MeasurementId] {
        &[MeasurementId::Time]
    }

    fn transform(&mut self, id: MeasurementId, payload: Vec<u8>) -> PipelineResult<Vec<u8>> {
        if id != MeasurementId::Time {
            return Ok(payload);
        }
        let epoch_ms = bytes_to_i64(&payload).ok_or_else(|| {
            PipelineError::Protocol(format!("time payload of {} bytes is not an integer", payload.len()))
        })?;
        Ok(fixed_width(&self.render(epoch_ms)?, TIME_WIDTH))
    }
}

/// Unit conversion applied before formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Identity,
    FahrenheitToCelsius,
    FeetToMeters,
}

impl Conversion {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Conversion::Identity => value,
            Conversion::FahrenheitToCelsius => (value - 32.0) / 1.8,
            Conversion::FeetToMeters => value / FEET_PER_METER,
        }
    }
}

/// Converts an `f64` field and renders it as fixed-width decimal text.
#[derive(Debug, Clone)]
pub struct NumericFormatter {
    id: [MeasurementId; 1],
    conversion: Conversion,
    int_digits: usize,
    frac_digits: usize,
    width: usize,
}

impl NumericFormatter {
    pub fn new(
        id: MeasurementId,
        conversion: Conversion,
        int_digits: usize,
        frac_digits: usize,
        width: usize,
    ) -> Self {
        Self {
            id: [id],
            conversion,
            int_digits,
            frac_digits,
            width,
        }
    }

    /// °F to °C, `#000.00000`.
    pub fn temperature_celsius() -> Self {
        Self::new(MeasurementId::Temperature, Conversion::FahrenheitToCelsius, 3, 5, TEMPERATURE_WIDTH)
    }

    /// Feet to metres, `#000000.00000`.
    pub fn altitude_meters() -> Self {
        Self::new(MeasurementId::Altitude, Conversion::FeetToMeters, 6, 5, ALTITUDE_WIDTH)
    }

    /// Feet, `#000000.00000`.
    pub fn altitude_feet() -> Self {
        Self::new(MeasurementId::Altitude, Conversion::Identity, 6, 5, ALTITUDE_WIDTH)
    }

    /// PSI, `#00.00000`.
    pub fn pressure() -> Self {
        Self::new(MeasurementId::Pressure, Conversion::Identity, 2, 5, PRESSURE_WIDTH)
    }

    pub fn id(&self) -> MeasurementId {
        self.id[0]
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn render(&self, raw: f64) -> String {
        decimal_format(self.conversion.apply(raw), self.int_digits, self.frac_digits)
    }
}

impl Transform for NumericFormatter {
    fn required_ids(&self) -> &[MeasurementId] {
        &self.id
    }

    fn transform(&mut self, id: MeasurementId, payload: Vec<u8>) -> PipelineResult<Vec<u8>> {
        if id != self.id() {
            return Ok(payload);
        }
        let raw = bytes_to_f64(&payload).ok_or_else(|| {
            PipelineError::Protocol(format!("{} payload of {} bytes is not an f64", id, payload.len()))
        })?;
        Ok(fixed_width(&self.render(raw), self.width))
    }
}
