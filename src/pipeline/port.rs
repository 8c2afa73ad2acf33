//! Byte-stream ports between filters.
//!
//! Each connection is a crossbeam channel carrying byte chunks. The producer
//! owns the [`OutputPort`] (sender half), the consumer the [`InputPort`]
//! (receiver half). Writers push one chunk per record; readers consume the
//! stream byte by byte, so chunking is invisible to the protocol.
//!
//! End-of-stream is signalled by channel closure: when the producer drops its
//! sender, the consumer still drains every buffered chunk before
//! `recv` reports disconnection. No consumer can observe end-of-stream while
//! unread bytes remain.
//!
//! A read on a live but silent producer blocks indefinitely; there is no
//! timeout.

use crate::config::StreamConfig;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::id::FilterId;
use crate::pipeline::record::{decode_measurement_id, Record};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use serde::Serialize;
use std::fmt;

/// Whether a port is an input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// Create the two halves of a connection.
///
/// `capacity` is measured in chunks; `0` means unbounded.
pub fn channel(producer: FilterId, consumer: FilterId, capacity: usize) -> (OutputPort, InputPort) {
    let (tx, rx) = if capacity == 0 {
        unbounded()
    } else {
        bounded(capacity)
    };
    (OutputPort::new(consumer, tx), InputPort::new(producer, rx))
}

/// Sending half of a connection, owned by the producer.
pub struct OutputPort {
    peer: FilterId,
    tx: Option<Sender<Vec<u8>>>,
    bytes_written: u64,
    peer_gone: bool,
}

impl OutputPort {
    fn new(peer: FilterId, tx: Sender<Vec<u8>>) -> Self {
        Self {
            peer,
            tx: Some(tx),
            bytes_written: 0,
            peer_gone: false,
        }
    }

    /// The consumer on the other end.
    pub fn peer(&self) -> FilterId {
        self.peer
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn write_byte(&mut self, byte: u8) {
        self.write_bytes(&[byte]);
    }

    /// Push a chunk downstream.
    ///
    /// Blocks only if the channel is bounded and full. If the consumer has
    /// already terminated the bytes are discarded; the first such write is
    /// logged.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let Some(tx) = &self.tx else {
            tracing::warn!(peer = %self.peer, "Write on closed output port discarded");
            return;
        };
        if tx.send(bytes.to_vec()).is_err() {
            if !self.peer_gone {
                tracing::warn!(peer = %self.peer, "Downstream filter has terminated, discarding output");
                self.peer_gone = true;
            }
            return;
        }
        self.bytes_written += bytes.len() as u64;
    }

    /// Drop the sender, signalling end-of-stream to the consumer. Idempotent.
    pub fn close(&mut self) {
        self.tx.take();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

/// Receiving half of a connection, owned by the consumer.
pub struct InputPort {
    peer: FilterId,
    rx: Option<Receiver<Vec<u8>>>,
    chunk: Vec<u8>,
    pos: usize,
    bytes_read: u64,
    ended: bool,
}

impl InputPort {
    fn new(peer: FilterId, rx: Receiver<Vec<u8>>) -> Self {
        Self {
            peer,
            rx: Some(rx),
            chunk: Vec::new(),
            pos: 0,
            bytes_read: 0,
            ended: false,
        }
    }

    /// The producer on the other end.
    pub fn peer(&self) -> FilterId {
        self.peer
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Whether end-of-stream has been observed.
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Read the next byte, blocking until one arrives.
    ///
    /// Returns `None` once the producer has closed and every buffered byte
    /// has been consumed.
    pub fn read_byte(&mut self) -> Option<u8> {
        loop {
            if let Some(&byte) = self.chunk.get(self.pos) {
                self.pos += 1;
                self.bytes_read += 1;
                return Some(byte);
            }
            if !self.refill() {
                return None;
            }
        }
    }

    /// Read exactly `n` bytes into `buf`.
    ///
    /// Returns the number of bytes read, which is less than `n` only at
    /// end-of-stream.
    pub fn read_into(&mut self, buf: &mut Vec<u8>, n: usize) -> usize {
        let start = buf.len();
        while buf.len() - start < n {
            let available = &self.chunk[self.pos..];
            if available.is_empty() {
                if !self.refill() {
                    break;
                }
                continue;
            }
            let take = available.len().min(n - (buf.len() - start));
            buf.extend_from_slice(&available[..take]);
            self.pos += take;
            self.bytes_read += take as u64;
        }
        buf.len() - start
    }

    /// Read one full record using the reader's stream config.
    ///
    /// `Ok(None)` signals end-of-stream. A stream ending in the middle of a
    /// record is treated as end-of-stream and the partial bytes are dropped.
    pub fn read_record(&mut self, config: &StreamConfig) -> PipelineResult<Option<Record>> {
        let width = config.id_width();
        let mut id_bytes = Vec::with_capacity(width);
        let got = self.read_into(&mut id_bytes, width);
        if got < width {
            if got > 0 {
                tracing::warn!(peer = %self.peer, bytes = got, "Stream ended inside a record id, dropping partial record");
            }
            return Ok(None);
        }

        let id = decode_measurement_id(&id_bytes, config)?;
        // decode_measurement_id guarantees the length entry exists
        let len = config.length_for(id).unwrap_or_default();
        let mut payload = Vec::with_capacity(len);
        let got = self.read_into(&mut payload, len);
        if got < len {
            tracing::warn!(
                peer = %self.peer,
                id = %id,
                expected = len,
                got,
                "Stream ended inside a record payload, dropping partial record"
            );
            return Ok(None);
        }
        Ok(Some(Record { id, payload }))
    }

    /// Copy every remaining byte to `out` unchanged, until end-of-stream.
    ///
    /// Returns the number of bytes forwarded.
    pub fn forward_remaining(&mut self, out: &mut OutputPort) -> u64 {
        let mut forwarded = 0u64;
        loop {
            let rest = &self.chunk[self.pos..];
            if !rest.is_empty() {
                out.write_bytes(rest);
                forwarded += rest.len() as u64;
                self.bytes_read += rest.len() as u64;
                self.pos = self.chunk.len();
            }
            if !self.refill() {
                return forwarded;
            }
        }
    }

    /// Drop the receiver. Idempotent.
    pub fn close(&mut self) {
        self.rx.take();
        self.chunk.clear();
        self.pos = 0;
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_none()
    }

    fn refill(&mut self) -> bool {
        if self.ended {
            return false;
        }
        let next = match &self.rx {
            Some(rx) => rx.recv().ok(),
            None => None,
        };
        match next {
            Some(chunk) => {
                self.chunk = chunk;
                self.pos = 0;
                true
            }
            None => {
                self.ended = true;
                self.chunk.clear();
                self.pos = 0;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MeasurementId;
    use std::thread;

    fn pair(capacity: usize) -> (OutputPort, InputPort) {
        channel(FilterId(0), FilterId(1), capacity)
    }

    #[test]
    fn test_bytes_arrive_in_order_across_chunks() {
        let (mut out, mut input) = pair(0);
        out.write_bytes(&[1, 2]);
        out.write_byte(3);
        out.write_bytes(&[4, 5, 6]);
        out.close();

        let got: Vec<u8> = std::iter::from_fn(|| input.read_byte()).collect();
        assert_eq!(got, vec![1, 2, 3, 4, 5, 6]);
        assert!(input.has_ended());
        assert_eq!(input.bytes_read(), 6);
    }

    #[test]
    fn test_end_of_stream_waits_for_buffered_bytes() {
        let (mut out, mut input) = pair(0);
        out.write_bytes(&[9, 9, 9]);
        // producer is gone before the consumer reads anything
        drop(out);

        assert_eq!(input.read_byte(), Some(9));
        assert_eq!(input.read_byte(), Some(9));
        assert_eq!(input.read_byte(), Some(9));
        assert_eq!(input.read_byte(), None);
        assert_eq!(input.read_byte(), None);
    }

    #[test]
    fn test_read_record_and_truncation() {
        let config = StreamConfig::default();
        let (mut out, mut input) = pair(0);
        let record = Record::from_f64(MeasurementId::Pressure, 12.5);
        let bytes = record.encode(4);
        out.write_bytes(&bytes);
        out.write_bytes(&bytes[..6]);
        out.close();

        assert_eq!(input.read_record(&config).unwrap(), Some(record));
        assert_eq!(input.read_record(&config).unwrap(), None);
    }

    #[test]
    fn test_read_record_unknown_id_is_protocol_error() {
        let config = StreamConfig::default();
        let (mut out, mut input) = pair(0);
        out.write_bytes(&[0, 0, 0, 42, 1, 2, 3, 4, 5, 6, 7, 8]);
        out.close();
        assert!(input.read_record(&config).is_err());
    }

    #[test]
    fn test_forward_remaining() {
        let (mut up_out, mut up_in) = pair(0);
        let (mut down_out, mut down_in) = pair(0);
        up_out.write_bytes(&[1, 2, 3]);
        up_out.write_bytes(&[4]);
        up_out.close();

        assert_eq!(up_in.read_byte(), Some(1));
        assert_eq!(up_in.forward_remaining(&mut down_out), 3);
        down_out.close();

        let got: Vec<u8> = std::iter::from_fn(|| down_in.read_byte()).collect();
        assert_eq!(got, vec![2, 3, 4]);
    }

    #[test]
    fn test_bounded_channel_across_threads() {
        let (mut out, mut input) = pair(2);
        let producer = thread::spawn(move || {
            for i in 0..100u8 {
                out.write_byte(i);
            }
        });
        let got: Vec<u8> = std::iter::from_fn(|| input.read_byte()).collect();
        producer.join().unwrap();
        assert_eq!(got, (0..100u8).collect::<Vec<_>>());
    }

    #[test]
    fn test_write_after_consumer_closed_is_discarded() {
        let (mut out, mut input) = pair(0);
        input.close();
        out.write_bytes(&[1, 2, 3]);
        assert_eq!(out.bytes_written(), 0);
    }
}
