//! Source and sink adapters.
//!
//! These bind the [`ByteSource`] / [`ByteSink`] capabilities to files and
//! memory. Sources are pulled one byte at a time by the source driver, which
//! batches them into channel chunks.

use crate::pipeline::filter::{ByteSink, ByteSource};
use std::fs::File;
use std::io::{self, BufRead, BufReader, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Buffered reader over a file.
pub struct FileSource {
    path: PathBuf,
    reader: BufReader<File>,
}

impl FileSource {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        tracing::debug!(path = %path.display(), "Opened source file");
        Ok(Self {
            path,
            reader: BufReader::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn has_reached_end(&mut self) -> io::Result<bool> {
        Ok(self.reader.fill_buf()?.is_empty())
    }

    fn read_one_byte(&mut self) -> io::Result<u8> {
        let byte = match self.reader.fill_buf()?.first() {
            Some(&byte) => byte,
            None => return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of source file")),
        };
        self.reader.consume(1);
        Ok(byte)
    }
}

/// Source over an in-memory buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    bytes: Vec<u8>,
    pos: usize,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            pos: 0,
        }
    }
}

impl ByteSource for MemorySource {
    fn has_reached_end(&mut self) -> io::Result<bool> {
        Ok(self.pos >= self.bytes.len())
    }

    fn read_one_byte(&mut self) -> io::Result<u8> {
        let byte = self
            .bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "read past end of memory source"))?;
        self.pos += 1;
        Ok(byte)
    }
}

/// Writes to a file, flushing at every newline and on release.
pub struct FileSink {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl FileSink {
    /// Create or truncate the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        tracing::debug!(path = %path.display(), "Created sink file");
        Ok(Self {
            path,
            writer: LineWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSink for FileSink {
    fn write_one_byte(&mut self, byte: u8) -> io::Result<()> {
        self.writer.write_all(&[byte])
    }

    fn release(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        tracing::debug!(path = %self.path.display(), "Sink file flushed");
        Ok(())
    }
}

/// Discards everything, counting bytes.
#[derive(Debug, Default)]
pub struct NullSink {
    discarded: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl ByteSink for NullSink {
    fn write_one_byte(&mut self, _byte: u8) -> io::Result<()> {
        self.discarded += 1;
        Ok(())
    }

    fn release(&mut self) -> io::Result<()> {
        tracing::trace!(bytes = self.discarded, "Null sink released");
        Ok(())
    }
}

/// Collects bytes into a buffer shared with the caller.
///
/// Clones share the same buffer, so a clone kept outside the pipeline can
/// read what the sink received after the run.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl ByteSink for MemorySink {
    fn write_one_byte(&mut self, byte: u8) -> io::Result<()> {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(source: &mut dyn ByteSource) -> Vec<u8> {
        let mut out = Vec::new();
        while !source.has_reached_end().unwrap() {
            out.push(source.read_one_byte().unwrap());
        }
        out
    }

    #[test]
    fn test_memory_source() {
        let mut source = MemorySource::new(vec![1, 2, 3]);
        assert_eq!(drain(&mut source), vec![1, 2, 3]);
        assert!(source.read_one_byte().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.dat");

        let mut sink = FileSink::create(&path).unwrap();
        for &b in b"line one\nline two" {
            sink.write_one_byte(b).unwrap();
        }
        sink.release().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"line one\nline two".to_vec());

        let mut source = FileSource::open(&path).unwrap();
        assert_eq!(drain(&mut source), b"line one\nline two".to_vec());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(FileSource::open(dir.path().join("nope.dat")).is_err());
    }

    #[test]
    fn test_memory_sink_shares_buffer() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write_one_byte(b'x').unwrap();
        assert_eq!(sink.contents(), b"x".to_vec());
    }

    #[test]
    fn test_null_sink_counts() {
        let mut sink = NullSink::new();
        sink.write_one_byte(0).unwrap();
        sink.write_one_byte(0).unwrap();
        assert_eq!(sink.discarded(), 2);
    }
}
