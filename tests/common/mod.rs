//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use telepipe::config::StreamConfig;
use telepipe::pipeline::Record;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Decode a whole byte stream with `config`, panicking on trailing bytes.
pub fn decode_all(mut bytes: &[u8], config: &StreamConfig) -> Vec<Record> {
    let mut records = Vec::new();
    while !bytes.is_empty() {
        let (record, used) = Record::decode(bytes, config).expect("stream should decode cleanly");
        records.push(record);
        bytes = &bytes[used..];
    }
    records
}

/// Text lines of a line-formatted output, split on tabs.
pub fn columns(text: &str) -> Vec<Vec<String>> {
    text.lines()
        .map(|line| line.split('\t').map(str::to_string).collect())
        .collect()
}
