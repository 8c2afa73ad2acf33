//! Run loops for each filter kind.
//!
//! A driver owns the control flow of one filter thread: it pulls records
//! through the [`FilterCore`] primitives, hands them to the policy and writes
//! whatever the policy produces. Drivers return on end-of-stream or on the
//! first error; closing the ports is left to the caller so it happens on both
//! paths.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::filter::{
    ByteSink, ByteSource, Combiner, FilterBehavior, FilterCore, FilterState, Router,
    SplitOutputs, Transform,
};
use crate::pipeline::id::Side;
use crate::pipeline::record::Record;

/// Bytes a source accumulates before pushing a chunk downstream.
pub const SOURCE_CHUNK_SIZE: usize = 4096;

/// Dispatch to the driver matching the behavior's kind.
pub fn drive(core: &mut FilterCore, behavior: &mut FilterBehavior) -> PipelineResult<()> {
    core.transition(FilterState::Running);
    match behavior {
        FilterBehavior::Source(source) => run_source(core, source.as_mut()),
        FilterBehavior::Sink(sink) => run_sink(core, sink.as_mut()),
        FilterBehavior::Simple(transform) => run_simple(core, transform.as_mut()),
        FilterBehavior::Splitting(router) => run_splitting(core, router.as_mut()),
        FilterBehavior::Aggregating(combiner) => run_aggregating(core, combiner.as_mut()),
    }
}

/// Pump bytes from an external source until it reports its end.
pub fn run_source(core: &mut FilterCore, source: &mut dyn ByteSource) -> PipelineResult<()> {
    let mut chunk = Vec::with_capacity(SOURCE_CHUNK_SIZE);
    let pumped = pump_source(core, source, &mut chunk);
    // bytes read before a failure still go downstream
    core.write_raw(Side::One, &chunk)?;
    pumped
}

fn pump_source(
    core: &mut FilterCore,
    source: &mut dyn ByteSource,
    chunk: &mut Vec<u8>,
) -> PipelineResult<()> {
    while !source.has_reached_end()? {
        chunk.push(source.read_one_byte()?);
        if chunk.len() >= SOURCE_CHUNK_SIZE {
            core.write_raw(Side::One, chunk)?;
            chunk.clear();
        }
    }
    Ok(())
}

/// Copy the input byte stream into an external sink, then release it.
pub fn run_sink(core: &mut FilterCore, sink: &mut dyn ByteSink) -> PipelineResult<()> {
    let copied = copy_into_sink(core, sink);
    // release even when the copy failed part way
    let released = sink.release();
    copied?;
    released?;
    Ok(())
}

fn copy_into_sink(core: &mut FilterCore, sink: &mut dyn ByteSink) -> PipelineResult<()> {
    while let Some(byte) = core.read_byte(Side::One)? {
        sink.write_one_byte(byte)?;
    }
    Ok(())
}

pub fn run_simple(core: &mut FilterCore, transform: &mut dyn Transform) -> PipelineResult<()> {
    while let Some(record) = core.read_record(Side::One)? {
        let id = record.id;
        let payload = transform.transform(id, record.payload)?;
        if !payload.is_empty() {
            core.write_record(Side::One, &Record::new(id, payload))?;
        }
        if let Some(raw) = transform.take_raw_output() {
            core.write_raw(Side::One, &raw)?;
        }
    }
    Ok(())
}

pub fn run_splitting(core: &mut FilterCore, router: &mut dyn Router) -> PipelineResult<()> {
    while let Some(record) = core.read_record(Side::One)? {
        router.route(record, &mut SplitOutputs::new(core))?;
    }
    core.transition(FilterState::Draining);
    router.on_end_of_stream(&mut SplitOutputs::new(core))
}

/// Merge two inputs under the combiner's control.
///
/// The first side to reach end-of-stream triggers the drain: the combiner
/// flushes what it holds, then the rest of the open side is copied through
/// without decoding.
pub fn run_aggregating(core: &mut FilterCore, combiner: &mut dyn Combiner) -> PipelineResult<()> {
    loop {
        let mut progressed = false;
        for side in Side::BOTH {
            if !combiner.should_read(side) {
                continue;
            }
            match core.read_record(side)? {
                Some(record) => {
                    combiner.on_record(side, record)?;
                    progressed = true;
                }
                None => return drain_aggregating(core, combiner, side),
            }
        }

        if combiner.is_complete() {
            let records = combiner.take_aggregated()?;
            core.write_records(Side::One, &records)?;
        } else if !progressed {
            return Err(PipelineError::Protocol(format!(
                "aggregating filter '{}' stalled: no side wants input and no output is ready",
                core.name()
            )));
        }
    }
}

fn drain_aggregating(
    core: &mut FilterCore,
    combiner: &mut dyn Combiner,
    ended: Side,
) -> PipelineResult<()> {
    let open = ended.other();
    core.transition(FilterState::Draining);
    tracing::debug!(filter = %core.name(), ended = %ended, "Input ended, draining the other side");

    let flushed = combiner.on_end_of_stream(ended)?;
    core.write_records(Side::One, &flushed)?;
    core.close_input(ended);
    let forwarded = core.forward_remaining(open, Side::One)?;
    tracing::debug!(filter = %core.name(), side = %open, bytes = forwarded, "Forwarded remaining input verbatim");
    Ok(())
}
