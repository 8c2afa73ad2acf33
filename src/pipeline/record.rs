//! Wire record codec.
//!
//! A record is an `(id, payload)` pair laid out as
//!
//! ```text
//! [id: N bytes, big-endian unsigned][payload: L bytes]
//! ```
//!
//! where `N` is the id width and `L` the payload length bound to the id, both
//! taken from the [`StreamConfig`] of the reading filter. There is no
//! delimiter; record boundaries come entirely from the length table.
//!
//! Numeric payloads are big-endian: `f64` values are carried as their IEEE-754
//! bit pattern, integers as two's complement.

use crate::config::StreamConfig;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::types::MeasurementId;

/// One measurement on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: MeasurementId,
    pub payload: Vec<u8>,
}

impl Record {
    pub fn new(id: MeasurementId, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Record carrying an `f64` as 8 big-endian bytes.
    pub fn from_f64(id: MeasurementId, value: f64) -> Self {
        Self::new(id, f64_to_bytes(value))
    }

    /// Record carrying an `i64` as 8 big-endian bytes.
    pub fn from_i64(id: MeasurementId, value: i64) -> Self {
        Self::new(id, value.to_be_bytes())
    }

    pub fn as_f64(&self) -> PipelineResult<f64> {
        bytes_to_f64(&self.payload).ok_or_else(|| self.width_error("f64"))
    }

    pub fn as_i64(&self) -> PipelineResult<i64> {
        bytes_to_i64(&self.payload).ok_or_else(|| self.width_error("integer"))
    }

    /// Size of the encoded record for the given id width.
    #[inline]
    pub fn encoded_len(&self, id_width: usize) -> usize {
        id_width + self.payload.len()
    }

    /// Append the wire form of this record to `buf`.
    ///
    /// The payload is written as-is: a filter that re-encodes a field emits a
    /// payload whose length matches the config of the *downstream* filter.
    pub fn encode_into(&self, id_width: usize, buf: &mut Vec<u8>) {
        buf.reserve(self.encoded_len(id_width));
        encode_id(self.id.code(), id_width, buf);
        buf.extend_from_slice(&self.payload);
    }

    pub fn encode(&self, id_width: usize) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_len(id_width));
        self.encode_into(id_width, &mut buf);
        buf
    }

    /// Decode one record from the front of `bytes`.
    ///
    /// Returns the record and the number of bytes consumed. Fails with a
    /// protocol error if the id is unknown to `config` or the slice is short.
    pub fn decode(bytes: &[u8], config: &StreamConfig) -> PipelineResult<(Record, usize)> {
        let width = config.id_width();
        if bytes.len() < width {
            return Err(PipelineError::Protocol(format!(
                "truncated id: need {} bytes, have {}",
                width,
                bytes.len()
            )));
        }
        let id = decode_measurement_id(&bytes[..width], config)?;
        let len = config
            .length_for(id)
            .ok_or_else(|| PipelineError::Protocol(format!("no length configured for {}", id)))?;
        let end = width + len;
        if bytes.len() < end {
            return Err(PipelineError::Protocol(format!(
                "truncated {} payload: need {} bytes, have {}",
                id,
                len,
                bytes.len() - width
            )));
        }
        Ok((Record::new(id, &bytes[width..end]), end))
    }

    fn width_error(&self, what: &str) -> PipelineError {
        PipelineError::Protocol(format!(
            "{} payload of {} bytes cannot be read as {}",
            self.id,
            self.payload.len(),
            what
        ))
    }
}

/// Write `code` as a big-endian unsigned integer of `width` bytes.
pub fn encode_id(code: u64, width: usize, buf: &mut Vec<u8>) {
    for shift in (0..width).rev() {
        let byte = if shift >= 8 { 0 } else { (code >> (shift * 8)) as u8 };
        buf.push(byte);
    }
}

/// Read a big-endian unsigned integer. Leading bytes beyond 8 must be zero.
pub fn read_be_u64(bytes: &[u8]) -> Option<u64> {
    let overflow = bytes.len().saturating_sub(8);
    if bytes[..overflow].iter().any(|&b| b != 0) {
        return None;
    }
    Some(
        bytes[overflow..]
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
    )
}

/// Resolve the id field of a record against a stream config.
pub fn decode_measurement_id(bytes: &[u8], config: &StreamConfig) -> PipelineResult<MeasurementId> {
    let code = read_be_u64(bytes)
        .ok_or_else(|| PipelineError::Protocol(format!("id field {:02X?} out of range", bytes)))?;
    let id = MeasurementId::from_code(code)
        .ok_or_else(|| PipelineError::Protocol(format!("unknown measurement id {}", code)))?;
    if !config.contains(id) {
        return Err(PipelineError::Protocol(format!(
            "measurement {} has no length in this filter's stream config",
            id
        )));
    }
    Ok(id)
}

#[inline]
pub fn f64_to_bytes(value: f64) -> [u8; 8] {
    value.to_bits().to_be_bytes()
}

/// Interpret exactly 8 bytes as a big-endian `f64`.
pub fn bytes_to_f64(bytes: &[u8]) -> Option<f64> {
    let raw: [u8; 8] = bytes.try_into().ok()?;
    Some(f64::from_bits(u64::from_be_bytes(raw)))
}

/// Interpret up to 8 bytes as a big-endian two's complement integer.
pub fn bytes_to_i64(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }
    let unsigned = read_be_u64(bytes)?;
    let bits = bytes.len() * 8;
    if bits == 64 {
        return Some(unsigned as i64);
    }
    // sign-extend narrower fields
    let shift = 64 - bits;
    Some(((unsigned << shift) as i64) >> shift)
}
