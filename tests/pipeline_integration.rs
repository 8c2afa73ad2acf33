//! Integration tests for the stream engine
//!
//! These tests validate small pipelines end to end:
//! - Wiring rules enforced by `connect` and `start`
//! - Byte fidelity of pass-through filters
//! - Splitting and aggregating filters over real channels
//! - Failure propagation as early end-of-stream

mod common;

use common::builders::{FlightStreamBuilder, FrameBuilder};
use common::mock_helpers::{FailingSink, FailingSource};
use common::{assert_float_eq, decode_all};
use std::sync::Arc;
use telepipe::config::{StreamConfig, StreamConfigBuilder};
use telepipe::pipeline::filters::{
    FieldDropFilter, MemorySink, MemorySource, TimeSortMerger, TraceTap, WildPointFilter,
};
use telepipe::pipeline::{FilterOutcome, FilterState, Pipeline, PipelineError, Record};
use telepipe::MeasurementId::{self, *};

fn raw() -> Arc<StreamConfig> {
    Arc::new(StreamConfig::default())
}

fn identity() -> impl FnMut(MeasurementId, Vec<u8>) -> telepipe::pipeline::PipelineResult<Vec<u8>> + Send {
    |_, payload| Ok(payload)
}

/// Frames of {time, altitude, pressure} in wire form.
fn sort_stream(times: &[i64]) -> Vec<u8> {
    times
        .iter()
        .fold(FlightStreamBuilder::new(), |b, &t| {
            b.record(Record::from_i64(Time, t))
                .record(Record::from_f64(Altitude, 1_000.0 + t as f64))
                .record(Record::from_f64(Pressure, 10.0))
        })
        .build()
}

fn times_of(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .filter(|r| r.id == Time)
        .map(|r| r.as_i64().unwrap())
        .collect()
}

#[test]
fn test_cardinality_is_enforced() {
    let mut p = Pipeline::new();
    let src = p.add_source("src", MemorySource::default());
    let a = p.add_simple("a", raw(), identity()).unwrap();
    let b = p.add_simple("b", raw(), identity()).unwrap();
    let sink = p.add_sink("sink", MemorySink::new());

    p.connect(src, a).unwrap();
    assert!(matches!(p.connect(src, b), Err(PipelineError::Cardinality { .. })));
    assert!(matches!(p.connect(sink, a), Err(PipelineError::Cardinality { .. })));

    // a failed connect leaves nothing behind
    assert_eq!(p.edges().len(), 1);

    let merge = p.add_aggregating("merge", raw(), TimeSortMerger::new()).unwrap();
    p.connect(merge, b).unwrap();
    assert!(matches!(p.connect(merge, sink), Err(PipelineError::Cardinality { .. })));
}

#[test]
fn test_start_rejects_unconnected_ports() {
    let mut p = Pipeline::new();
    let src = p.add_source("src", MemorySource::default());
    let split = p.add_splitting("split", raw(), WildPointFilter::pressure_only(10.0)).unwrap();
    let sink = p.add_sink("sink", MemorySink::new());
    p.connect(src, split).unwrap();
    p.connect(split, sink).unwrap();

    let err = p.start().err().expect("second output is missing");
    assert!(matches!(err, PipelineError::IncompleteWiring { connected: 1, required: 2, .. }));
}

#[test]
fn test_identity_chain_preserves_bytes() {
    let stream = FlightStreamBuilder::new()
        .frame(FrameBuilder::new(1_000))
        .frame(FrameBuilder::new(2_000).pressure(-4.25))
        .build();
    let sink = MemorySink::new();

    let mut p = Pipeline::new();
    let src = p.add_source("src", MemorySource::new(stream.clone()));
    let id1 = p.add_simple("identity", raw(), identity()).unwrap();
    let tap = p.add_simple("tap", raw(), TraceTap::new("mid")).unwrap();
    let out = p.add_sink("sink", sink.clone());
    p.connect(src, id1).unwrap();
    p.connect(id1, tap).unwrap();
    p.connect(tap, out).unwrap();

    let report = p.run().unwrap();
    assert!(report.is_success(), "{}", report);
    assert_eq!(sink.contents(), stream);

    let tap_report = report.filter("tap").unwrap();
    assert_eq!(tap_report.stats.records_in, 12);
    assert_eq!(tap_report.stats.records_out, 12);
    assert_eq!(tap_report.final_state, FilterState::Closed);
}

#[test]
fn test_identity_chain_with_bounded_channels() {
    let frames: Vec<(i64, f64)> = (0..2_000).map(|t| (t, 12.0)).collect();
    let stream = FlightStreamBuilder::new().pressures(&frames).build();
    let sink = MemorySink::new();

    let mut p = Pipeline::new().with_channel_capacity(2);
    let src = p.add_source("src", MemorySource::new(stream.clone()));
    let mid = p.add_simple("identity", raw(), identity()).unwrap();
    let out = p.add_sink("sink", sink.clone());
    p.connect(src, mid).unwrap();
    p.connect(mid, out).unwrap();

    assert!(p.run().unwrap().is_success());
    assert_eq!(sink.contents(), stream);
}

#[test]
fn test_field_drop_removes_every_pressure() {
    let stream = FlightStreamBuilder::new()
        .pressures(&[(1, 5.0), (2, 6.0), (3, 7.0)])
        .build();
    let sink = MemorySink::new();

    let mut p = Pipeline::new();
    let src = p.add_source("src", MemorySource::new(stream));
    let drop = p.add_simple("drop", raw(), FieldDropFilter::dropping(&[Pressure])).unwrap();
    let out = p.add_sink("sink", sink.clone());
    p.connect(src, drop).unwrap();
    p.connect(drop, out).unwrap();

    let report = p.run().unwrap();
    assert!(report.is_success());

    let records = decode_all(&sink.contents(), &StreamConfig::default());
    assert_eq!(records.len(), 15);
    assert!(records.iter().all(|r| r.id != Pressure));
    assert_eq!(times_of(&records), vec![1, 2, 3]);
}

#[test]
fn test_wild_point_split_end_to_end() {
    let config: Arc<StreamConfig> = Arc::new(
        StreamConfigBuilder::new()
            .with_length(Time, 8)
            .with_length(Pressure, 8)
            .build()
            .unwrap(),
    );
    let stream = [5.0, 200.0, -3.0, 300.0, 7.0]
        .iter()
        .enumerate()
        .fold(FlightStreamBuilder::new(), |b, (t, &p)| {
            b.record(Record::from_i64(Time, t as i64))
                .record(Record::from_f64(Pressure, p))
        })
        .build();
    let wild = MemorySink::new();
    let valid = MemorySink::new();

    let mut p = Pipeline::new();
    let src = p.add_source("src", MemorySource::new(stream));
    let split = p.add_splitting("wild_point", config.clone(), WildPointFilter::pressure_only(10.0)).unwrap();
    let wild_out = p.add_sink("wild", wild.clone());
    let valid_out = p.add_sink("valid", valid.clone());
    p.connect(src, split).unwrap();
    p.connect(split, wild_out).unwrap();
    p.connect(split, valid_out).unwrap();

    let report = p.run().unwrap();
    assert!(report.is_success(), "{}", report);

    let pressures = |records: Vec<Record>| -> Vec<f64> {
        records
            .iter()
            .filter(|r| r.id == Pressure)
            .map(|r| r.as_f64().unwrap())
            .collect()
    };
    let valid_records = decode_all(&valid.contents(), &config);
    assert_eq!(times_of(&valid_records), vec![0, 1, 2, 3, 4]);
    let corrected = pressures(valid_records);
    for (got, want) in corrected.iter().zip([5.0, 6.0, 6.0, 6.0, 7.0]) {
        assert_float_eq(*got, want, 1e-9);
    }
    assert_eq!(pressures(decode_all(&wild.contents(), &config)), vec![200.0, -3.0, 300.0]);
}

#[test]
fn test_time_sort_merges_by_time() {
    let merged = MemorySink::new();

    let mut p = Pipeline::new();
    let a = p.add_source("a", MemorySource::new(sort_stream(&[1, 5, 9])));
    let b = p.add_source("b", MemorySource::new(sort_stream(&[2, 3, 10])));
    let sort = p.add_aggregating("sort", raw(), TimeSortMerger::new()).unwrap();
    let out = p.add_sink("out", merged.clone());
    p.connect(a, sort).unwrap();
    p.connect(b, sort).unwrap();
    p.connect(sort, out).unwrap();

    let report = p.run().unwrap();
    assert!(report.is_success(), "{}", report);

    let records = decode_all(&merged.contents(), &StreamConfig::default());
    assert_eq!(times_of(&records), vec![1, 2, 3, 5, 9, 10]);
    assert_eq!(records.len(), 18);
}

#[test]
fn test_time_sort_drain_flushes_cached_frame_then_copies_rest() {
    let merged = MemorySink::new();

    let mut p = Pipeline::new();
    let a = p.add_source("a", MemorySource::new(sort_stream(&[1])));
    let b = p.add_source("b", MemorySource::new(sort_stream(&[2, 40, 3])));
    let sort = p.add_aggregating("sort", raw(), TimeSortMerger::new()).unwrap();
    let out = p.add_sink("out", merged.clone());
    p.connect(a, sort).unwrap();
    p.connect(b, sort).unwrap();
    p.connect(sort, out).unwrap();

    let report = p.run().unwrap();
    assert!(report.is_success());

    // after side one ends, side two is passed through unsorted
    let records = decode_all(&merged.contents(), &StreamConfig::default());
    assert_eq!(times_of(&records), vec![1, 2, 40, 3]);
    assert_eq!(report.filter("sort").unwrap().final_state, FilterState::Closed);
}

#[test]
fn test_source_failure_is_reported_and_downstream_drains() {
    let stream = FlightStreamBuilder::new().pressures(&[(1, 5.0), (2, 6.0)]).build();
    let sink = MemorySink::new();

    let mut p = Pipeline::new();
    let src = p.add_source("src", FailingSource::after(stream.clone()));
    let mid = p.add_simple("identity", raw(), identity()).unwrap();
    let out = p.add_sink("sink", sink.clone());
    p.connect(src, mid).unwrap();
    p.connect(mid, out).unwrap();

    let report = p.run().unwrap();
    assert!(!report.is_success());
    assert_eq!(report.failures().count(), 1);
    match &report.filter("src").unwrap().outcome {
        FilterOutcome::Failed(msg) => assert!(msg.contains("telemetry link lost"), "{}", msg),
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(report.filter("identity").unwrap().outcome.is_completed());
    assert_eq!(sink.contents(), stream);
}

#[test]
fn test_sink_failure_does_not_block_upstream() {
    let frames: Vec<(i64, f64)> = (0..500).map(|t| (t, 12.0)).collect();
    let stream = FlightStreamBuilder::new().pressures(&frames).build();

    let mut p = Pipeline::new().with_channel_capacity(1);
    let src = p.add_source("src", MemorySource::new(stream));
    let mid = p.add_simple("identity", raw(), identity()).unwrap();
    let out = p.add_sink("sink", FailingSink::with_capacity(100));
    p.connect(src, mid).unwrap();
    p.connect(mid, out).unwrap();

    let report = p.run().unwrap();
    let failed: Vec<&str> = report.failures().map(|f| f.name.as_str()).collect();
    assert_eq!(failed, vec!["sink"]);
    assert!(report.filter("src").unwrap().outcome.is_completed());
}
