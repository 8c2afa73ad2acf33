//! Filter abstraction for the pipeline.
//!
//! Two-layer design:
//! - **[`FilterCore`]** - port registries, cardinality checks, the record
//!   read/write primitives and the lifecycle state machine shared by every
//!   filter kind.
//! - **Policy traits** - the small capability each filter kind is
//!   parameterized by: [`Transform`] (simple), [`Router`] (splitting),
//!   [`Combiner`] (aggregating), [`ByteSource`] and [`ByteSink`] (adapters).
//!
//! [`FilterBehavior`] wraps one boxed policy so the executor can handle every
//! kind uniformly. The drivers that run each kind live in
//! [`crate::pipeline::driver`].

use crate::config::StreamConfig;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::frame::DataFrame;
use crate::pipeline::id::{FilterId, Side};
use crate::pipeline::port::{InputPort, OutputPort, PortDirection};
use crate::pipeline::record::Record;
use crate::types::MeasurementId;
use serde::Serialize;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The topology class of a filter, fixing its port cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// 0 in, 1 out
    Source,
    /// 1 in, 0 out
    Sink,
    /// 1 in, 1 out
    Simple,
    /// 1 in, 2 out
    Splitting,
    /// 2 in, 1 out
    Aggregating,
}

impl FilterKind {
    pub fn max_inputs(self) -> usize {
        match self {
            FilterKind::Source => 0,
            FilterKind::Sink | FilterKind::Simple | FilterKind::Splitting => 1,
            FilterKind::Aggregating => 2,
        }
    }

    pub fn max_outputs(self) -> usize {
        match self {
            FilterKind::Sink => 0,
            FilterKind::Source | FilterKind::Simple | FilterKind::Aggregating => 1,
            FilterKind::Splitting => 2,
        }
    }

    pub fn limit(self, direction: PortDirection) -> usize {
        match direction {
            PortDirection::Input => self.max_inputs(),
            PortDirection::Output => self.max_outputs(),
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterKind::Source => "source",
            FilterKind::Sink => "sink",
            FilterKind::Simple => "simple",
            FilterKind::Splitting => "splitting",
            FilterKind::Aggregating => "aggregating",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a filter.
///
/// `Created → Connected → Running → Draining → Closed`. `Draining` is entered
/// once some input has reported end-of-stream while work remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterState {
    Created,
    Connected,
    Running,
    Draining,
    Closed,
}

/// Per-filter traffic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub records_in: u64,
    pub records_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

/// State every filter owns regardless of kind.
pub struct FilterCore {
    id: FilterId,
    name: String,
    kind: FilterKind,
    config: Arc<StreamConfig>,
    inputs: Vec<InputPort>,
    outputs: Vec<OutputPort>,
    state: FilterState,
    stats: FilterStats,
}

impl FilterCore {
    pub fn new(id: FilterId, name: impl Into<String>, kind: FilterKind, config: Arc<StreamConfig>) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            config,
            inputs: Vec::new(),
            outputs: Vec::new(),
            state: FilterState::Created,
            stats: FilterStats::default(),
        }
    }

    pub fn id(&self) -> FilterId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Producers feeding this filter, in connection order.
    pub fn input_peers(&self) -> impl Iterator<Item = FilterId> + '_ {
        self.inputs.iter().map(InputPort::peer)
    }

    /// Consumers fed by this filter, in connection order.
    pub fn output_peers(&self) -> impl Iterator<Item = FilterId> + '_ {
        self.outputs.iter().map(OutputPort::peer)
    }

    // ── Connection hooks ──

    /// Fail if another port in `direction` would exceed the kind's limit.
    pub fn check_capacity(&self, direction: PortDirection) -> PipelineResult<()> {
        let (count, limit) = match direction {
            PortDirection::Input => (self.inputs.len(), self.kind.max_inputs()),
            PortDirection::Output => (self.outputs.len(), self.kind.max_outputs()),
        };
        if count >= limit {
            return Err(PipelineError::Cardinality {
                filter: self.name.clone(),
                kind: self.kind,
                direction,
                limit,
            });
        }
        Ok(())
    }

    pub fn on_input_connected(&mut self, port: InputPort) -> PipelineResult<()> {
        self.check_capacity(PortDirection::Input)?;
        tracing::debug!(filter = %self.name, peer = %port.peer(), "Input connected");
        self.inputs.push(port);
        self.transition(FilterState::Connected);
        Ok(())
    }

    pub fn on_output_connected(&mut self, port: OutputPort) -> PipelineResult<()> {
        self.check_capacity(PortDirection::Output)?;
        tracing::debug!(filter = %self.name, peer = %port.peer(), "Output connected");
        self.outputs.push(port);
        self.transition(FilterState::Connected);
        Ok(())
    }

    // ── Lifecycle ──

    /// Move forward in the lifecycle. Backward moves are ignored.
    pub fn transition(&mut self, next: FilterState) {
        if next > self.state {
            tracing::trace!(filter = %self.name, from = ?self.state, to = ?next, "State transition");
            self.state = next;
        }
    }

    /// Close every port and enter `Closed`. Idempotent.
    pub fn close_all(&mut self) {
        if self.state == FilterState::Closed {
            return;
        }
        for input in &mut self.inputs {
            input.close();
        }
        for output in &mut self.outputs {
            output.close();
        }
        self.transition(FilterState::Closed);
        tracing::debug!(filter = %self.name, "All ports closed");
    }

    // ── Data primitives ──

    /// Read one byte from the input on `side`; `None` at end-of-stream.
    pub fn read_byte(&mut self, side: Side) -> PipelineResult<Option<u8>> {
        let byte = self.input_mut(side)?.read_byte();
        if byte.is_some() {
            self.stats.bytes_in += 1;
        }
        Ok(byte)
    }

    /// Read one full record from the input on `side`; `None` at end-of-stream.
    pub fn read_record(&mut self, side: Side) -> PipelineResult<Option<Record>> {
        let config = Arc::clone(&self.config);
        let record = self.input_mut(side)?.read_record(&config)?;
        if let Some(record) = &record {
            self.stats.records_in += 1;
            self.stats.bytes_in += record.encoded_len(config.id_width()) as u64;
            tracing::trace!(filter = %self.name, side = %side, id = %record.id, "Record in");
        }
        Ok(record)
    }

    pub fn write_record(&mut self, side: Side, record: &Record) -> PipelineResult<()> {
        let bytes = record.encode(self.config.id_width());
        self.output_mut(side)?.write_bytes(&bytes);
        self.stats.records_out += 1;
        self.stats.bytes_out += bytes.len() as u64;
        Ok(())
    }

    pub fn write_records<'r>(
        &mut self,
        side: Side,
        records: impl IntoIterator<Item = &'r Record>,
    ) -> PipelineResult<()> {
        for record in records {
            self.write_record(side, record)?;
        }
        Ok(())
    }

    /// Write raw bytes that are not framed as records (text lines, source data).
    pub fn write_raw(&mut self, side: Side, bytes: &[u8]) -> PipelineResult<()> {
        self.output_mut(side)?.write_bytes(bytes);
        self.stats.bytes_out += bytes.len() as u64;
        Ok(())
    }

    /// Copy every remaining byte of input `from` to output `to` verbatim.
    pub fn forward_remaining(&mut self, from: Side, to: Side) -> PipelineResult<u64> {
        let (inputs, outputs) = (&mut self.inputs, &mut self.outputs);
        let input = inputs.get_mut(from.index()).ok_or_else(|| missing(&self.name, PortDirection::Input, from))?;
        let output = outputs.get_mut(to.index()).ok_or_else(|| missing(&self.name, PortDirection::Output, to))?;
        let forwarded = input.forward_remaining(output);
        self.stats.bytes_in += forwarded;
        self.stats.bytes_out += forwarded;
        Ok(forwarded)
    }

    pub fn close_input(&mut self, side: Side) {
        if let Some(input) = self.inputs.get_mut(side.index()) {
            input.close();
        }
    }

    pub fn is_input_closed(&self, side: Side) -> bool {
        self.inputs.get(side.index()).map_or(true, InputPort::is_closed)
    }

    fn input_mut(&mut self, side: Side) -> PipelineResult<&mut InputPort> {
        let name = &self.name;
        self.inputs
            .get_mut(side.index())
            .ok_or_else(|| missing(name, PortDirection::Input, side))
    }

    fn output_mut(&mut self, side: Side) -> PipelineResult<&mut OutputPort> {
        let name = &self.name;
        self.outputs
            .get_mut(side.index())
            .ok_or_else(|| missing(name, PortDirection::Output, side))
    }
}

fn missing(filter: &str, direction: PortDirection, side: Side) -> PipelineError {
    PipelineError::Configuration(format!("filter '{}' has no {} port {}", filter, direction, side))
}

// ── Policy traits ──

/// Per-record transform of a simple (1-in-1-out) filter.
///
/// Closures `FnMut(MeasurementId, Vec<u8>) -> PipelineResult<Vec<u8>>`
/// implement it directly.
pub trait Transform: Send {
    /// Ids that must have a length in this filter's stream config.
    fn required_ids(&self) -> &[MeasurementId] {
        &[]
    }

    /// Return the new payload, or an empty vector to drop the record.
    fn transform(&mut self, id: MeasurementId, payload: Vec<u8>) -> PipelineResult<Vec<u8>>;

    /// Unframed bytes to emit after the last record, e.g. a completed text line.
    fn take_raw_output(&mut self) -> Option<Vec<u8>> {
        None
    }
}

impl<F> Transform for F
where
    F: FnMut(MeasurementId, Vec<u8>) -> PipelineResult<Vec<u8>> + Send,
{
    fn transform(&mut self, id: MeasurementId, payload: Vec<u8>) -> PipelineResult<Vec<u8>> {
        self(id, payload)
    }
}

/// Output handle given to a [`Router`].
pub struct SplitOutputs<'a> {
    core: &'a mut FilterCore,
}

impl<'a> SplitOutputs<'a> {
    pub(crate) fn new(core: &'a mut FilterCore) -> Self {
        Self { core }
    }

    pub fn write_record(&mut self, side: Side, record: &Record) -> PipelineResult<()> {
        self.core.write_record(side, record)
    }

    /// Write every populated field of `frame` in layout order.
    pub fn write_frame(&mut self, side: Side, frame: &DataFrame) -> PipelineResult<()> {
        for record in frame.records() {
            self.core.write_record(side, &record)?;
        }
        Ok(())
    }
}

/// Routing policy of a splitting (1-in-2-out) filter.
pub trait Router: Send {
    fn required_ids(&self) -> &[MeasurementId] {
        &[]
    }

    /// Handle one record; may buffer it and write later.
    fn route(&mut self, record: Record, out: &mut SplitOutputs<'_>) -> PipelineResult<()>;

    /// Flush buffered state once the input has ended.
    fn on_end_of_stream(&mut self, _out: &mut SplitOutputs<'_>) -> PipelineResult<()> {
        Ok(())
    }
}

/// Merge policy of an aggregating (2-in-1-out) filter.
pub trait Combiner: Send {
    fn required_ids(&self) -> &[MeasurementId] {
        &[]
    }

    /// Whether the driver should pull the next record from `side`.
    fn should_read(&self, side: Side) -> bool;

    fn on_record(&mut self, side: Side, record: Record) -> PipelineResult<()>;

    /// Whether [`Combiner::take_aggregated`] has something to emit.
    fn is_complete(&self) -> bool;

    fn take_aggregated(&mut self) -> PipelineResult<Vec<Record>>;

    /// Called once when `ended` reaches end-of-stream while the other side is
    /// still open. The returned records are written before the remaining
    /// bytes of the open side are forwarded verbatim.
    fn on_end_of_stream(&mut self, _ended: Side) -> PipelineResult<Vec<Record>> {
        Ok(Vec::new())
    }
}

/// External byte producer driven by a source filter.
pub trait ByteSource: Send {
    fn has_reached_end(&mut self) -> io::Result<bool>;

    /// Only called after `has_reached_end` returned `false`.
    fn read_one_byte(&mut self) -> io::Result<u8>;
}

/// External byte consumer driven by a sink filter.
pub trait ByteSink: Send {
    fn write_one_byte(&mut self, byte: u8) -> io::Result<()>;

    /// Release the external resource at end-of-stream.
    fn release(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A boxed policy, tagged by filter kind.
pub enum FilterBehavior {
    Source(Box<dyn ByteSource>),
    Sink(Box<dyn ByteSink>),
    Simple(Box<dyn Transform>),
    Splitting(Box<dyn Router>),
    Aggregating(Box<dyn Combiner>),
}

impl FilterBehavior {
    pub fn kind(&self) -> FilterKind {
        match self {
            FilterBehavior::Source(_) => FilterKind::Source,
            FilterBehavior::Sink(_) => FilterKind::Sink,
            FilterBehavior::Simple(_) => FilterKind::Simple,
            FilterBehavior::Splitting(_) => FilterKind::Splitting,
            FilterBehavior::Aggregating(_) => FilterKind::Aggregating,
        }
    }

    pub fn required_ids(&self) -> &[MeasurementId] {
        match self {
            FilterBehavior::Source(_) | FilterBehavior::Sink(_) => &[],
            FilterBehavior::Simple(t) => t.required_ids(),
            FilterBehavior::Splitting(r) => r.required_ids(),
            FilterBehavior::Aggregating(c) => c.required_ids(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::port::channel;

    fn core(kind: FilterKind) -> FilterCore {
        FilterCore::new(FilterId(0), "under-test", kind, Arc::new(StreamConfig::default()))
    }

    #[test]
    fn test_cardinality_table() {
        assert_eq!(FilterKind::Simple.max_inputs(), 1);
        assert_eq!(FilterKind::Simple.max_outputs(), 1);
        assert_eq!(FilterKind::Splitting.max_outputs(), 2);
        assert_eq!(FilterKind::Aggregating.max_inputs(), 2);
        assert_eq!(FilterKind::Aggregating.max_outputs(), 1);
        assert_eq!(FilterKind::Source.max_inputs(), 0);
        assert_eq!(FilterKind::Sink.max_outputs(), 0);
    }

    #[test]
    fn test_input_hook_enforces_limit() {
        let mut splitter = core(FilterKind::Splitting);
        let (_o1, i1) = channel(FilterId(1), FilterId(0), 0);
        let (_o2, i2) = channel(FilterId(2), FilterId(0), 0);
        splitter.on_input_connected(i1).unwrap();
        assert_eq!(splitter.state(), FilterState::Connected);
        let err = splitter.on_input_connected(i2).unwrap_err();
        assert!(matches!(err, PipelineError::Cardinality { limit: 1, .. }));
    }

    #[test]
    fn test_close_all_is_idempotent() {
        let mut simple = core(FilterKind::Simple);
        let (out, _input) = channel(FilterId(0), FilterId(1), 0);
        simple.on_output_connected(out).unwrap();
        simple.close_all();
        simple.close_all();
        assert_eq!(simple.state(), FilterState::Closed);
    }

    #[test]
    fn test_transition_never_goes_backwards() {
        let mut simple = core(FilterKind::Simple);
        simple.transition(FilterState::Draining);
        simple.transition(FilterState::Running);
        assert_eq!(simple.state(), FilterState::Draining);
    }

    #[test]
    fn test_closure_is_a_transform() {
        let mut upper = |_id: MeasurementId, payload: Vec<u8>| -> PipelineResult<Vec<u8>> {
            Ok(payload.to_ascii_uppercase())
        };
        let out = Transform::transform(&mut upper, MeasurementId::Time, b"ab".to_vec()).unwrap();
        assert_eq!(out, b"AB".to_vec());
    }

    #[test]
    fn test_missing_port_is_configuration_error() {
        let mut simple = core(FilterKind::Simple);
        let err = simple
            .write_record(Side::One, &Record::from_i64(MeasurementId::Time, 1))
            .unwrap_err();
        assert!(err.is_configuration());
    }
}
