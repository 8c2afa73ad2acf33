//! Mock adapters for failure paths

use std::io;
use telepipe::pipeline::{ByteSink, ByteSource};

/// Source that yields `bytes` and then fails instead of reporting the end.
#[derive(Debug, Clone)]
pub struct FailingSource {
    bytes: Vec<u8>,
    pos: usize,
}

impl FailingSource {
    pub fn after(bytes: Vec<u8>) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl ByteSource for FailingSource {
    fn has_reached_end(&mut self) -> io::Result<bool> {
        Ok(false)
    }

    fn read_one_byte(&mut self) -> io::Result<u8> {
        let byte = self
            .bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "telemetry link lost"))?;
        self.pos += 1;
        Ok(byte)
    }
}

/// Sink that accepts `capacity` bytes and then fails every write.
#[derive(Debug, Clone)]
pub struct FailingSink {
    capacity: usize,
    written: usize,
}

impl FailingSink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity, written: 0 }
    }
}

impl ByteSink for FailingSink {
    fn write_one_byte(&mut self, _byte: u8) -> io::Result<()> {
        if self.written >= self.capacity {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.written += 1;
        Ok(())
    }
}
