//! TraceTap: logs every record it sees and passes it through unchanged.

use crate::pipeline::error::PipelineResult;
use crate::pipeline::filter::Transform;
use crate::pipeline::record::{bytes_to_f64, bytes_to_i64};
use crate::types::MeasurementId;

#[derive(Debug, Clone)]
pub struct TraceTap {
    label: String,
    seen: u64,
}

impl TraceTap {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            seen: 0,
        }
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }
}

/// Best-effort human rendering of a payload for log output.
pub fn describe_payload(id: MeasurementId, payload: &[u8]) -> String {
    match (id, payload.len()) {
        (MeasurementId::Time, 8) => bytes_to_i64(payload).map(|v| v.to_string()).unwrap_or_default(),
        (_, 8) => bytes_to_f64(payload).map(|v| v.to_string()).unwrap_or_default(),
        _ => String::from_utf8_lossy(payload)
            .trim_end_matches('\0')
            .trim()
            .to_string(),
    }
}

impl Transform for TraceTap {
    fn transform(&mut self, id: MeasurementId, payload: Vec<u8>) -> PipelineResult<Vec<u8>> {
        self.seen += 1;
        tracing::debug!(
            tap = %self.label,
            n = self.seen,
            id = %id,
            value = %describe_payload(id, &payload),
            "Record"
        );
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_through_and_counts() {
        let mut tap = TraceTap::new("after-drop");
        let payload = 7i64.to_be_bytes().to_vec();
        assert_eq!(tap.transform(MeasurementId::Time, payload.clone()).unwrap(), payload);
        assert_eq!(tap.seen(), 1);
    }

    #[test]
    fn test_describe_payload() {
        assert_eq!(describe_payload(MeasurementId::Time, &42i64.to_be_bytes()), "42");
        assert_eq!(describe_payload(MeasurementId::Pressure, &1.5f64.to_bits().to_be_bytes()), "1.5");
        assert_eq!(describe_payload(MeasurementId::Pressure, b"50.25000\0"), "50.25000");
    }
}
