//! Core data types for telepipe
//!
//! The measurement vocabulary shared by every filter in a pipeline.
//!
//! # Main Types
//!
//! - [`MeasurementId`] - Closed set of telemetry fields carried on the wire
//!
//! Ids are stable across the whole pipeline. Only the payload length and
//! encoding bound to an id changes as records pass through formatting
//! filters (see [`crate::config::StreamConfig`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of distinct measurement ids.
pub const MEASUREMENT_COUNT: usize = 6;

/// Identifies which telemetry field a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementId {
    /// Epoch milliseconds (raw) or a formatted date string
    Time,
    /// Velocity in knots
    Velocity,
    /// Altitude in feet (raw) or a formatted string
    Altitude,
    /// Pressure in PSI (raw) or a formatted string
    Pressure,
    /// Temperature in Fahrenheit (raw) or formatted Celsius
    Temperature,
    /// Attitude in degrees
    Attitude,
}

impl MeasurementId {
    /// All ids in wire-code order.
    pub const ALL: [MeasurementId; MEASUREMENT_COUNT] = [
        MeasurementId::Time,
        MeasurementId::Velocity,
        MeasurementId::Altitude,
        MeasurementId::Pressure,
        MeasurementId::Temperature,
        MeasurementId::Attitude,
    ];

    /// Numeric code written in the id field of a record.
    #[inline]
    pub fn code(self) -> u64 {
        self as u64
    }

    /// Index into per-id tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up an id from its wire code.
    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            MeasurementId::Time => "time",
            MeasurementId::Velocity => "velocity",
            MeasurementId::Altitude => "altitude",
            MeasurementId::Pressure => "pressure",
            MeasurementId::Temperature => "temperature",
            MeasurementId::Attitude => "attitude",
        }
    }
}

impl fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
