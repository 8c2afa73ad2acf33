//! Test data builders for encoded flight streams

use telepipe::config::DEFAULT_ID_WIDTH;
use telepipe::pipeline::Record;
use telepipe::MeasurementId;

/// One time step of raw flight data.
#[derive(Debug, Clone, Copy)]
pub struct FrameBuilder {
    time_ms: i64,
    velocity: f64,
    altitude: f64,
    pressure: f64,
    temperature: f64,
    attitude: f64,
}

impl FrameBuilder {
    pub fn new(time_ms: i64) -> Self {
        Self {
            time_ms,
            velocity: 250.0,
            altitude: 5_000.0,
            pressure: 14.7,
            temperature: 59.0,
            attitude: 2.5,
        }
    }

    pub fn altitude(mut self, feet: f64) -> Self {
        self.altitude = feet;
        self
    }

    pub fn pressure(mut self, psi: f64) -> Self {
        self.pressure = psi;
        self
    }

    pub fn temperature(mut self, fahrenheit: f64) -> Self {
        self.temperature = fahrenheit;
        self
    }

    /// Records in wire order: time first, then the rest by id code.
    pub fn records(&self) -> Vec<Record> {
        use MeasurementId::*;
        vec![
            Record::from_i64(Time, self.time_ms),
            Record::from_f64(Velocity, self.velocity),
            Record::from_f64(Altitude, self.altitude),
            Record::from_f64(Pressure, self.pressure),
            Record::from_f64(Temperature, self.temperature),
            Record::from_f64(Attitude, self.attitude),
        ]
    }
}

/// Builder for a raw byte stream of frames.
#[derive(Debug, Clone, Default)]
pub struct FlightStreamBuilder {
    records: Vec<Record>,
}

impl FlightStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(mut self, frame: FrameBuilder) -> Self {
        self.records.extend(frame.records());
        self
    }

    pub fn record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    /// One frame per `(time, pressure)` pair.
    pub fn pressures(self, readings: &[(i64, f64)]) -> Self {
        readings
            .iter()
            .fold(self, |b, &(t, p)| b.frame(FrameBuilder::new(t).pressure(p)))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        for record in &self.records {
            record.encode_into(DEFAULT_ID_WIDTH, &mut bytes);
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_builder() {
        let bytes = FlightStreamBuilder::new()
            .frame(FrameBuilder::new(1_000).pressure(12.0))
            .build();
        assert_eq!(bytes.len(), 6 * (DEFAULT_ID_WIDTH + 8));
        assert_eq!(&bytes[..4], &[0, 0, 0, 0]);
    }
}
