//! Pipeline executor: graph assembly and the thread-per-filter scheduler.
//!
//! Assembly happens on the caller's thread:
//! 1. Add filters (`add_source`, `add_simple`, ...). Each filter's required
//!    ids are checked against its stream config.
//! 2. `connect` producers to consumers. Cardinality and duplicate bindings
//!    are checked immediately.
//! 3. `start` checks that every port is filled and that the graph is acyclic,
//!    then spawns one named thread per filter.
//!
//! Once started the topology is fixed. Each filter runs until its inputs
//! report end-of-stream or it fails; `join` collects a [`PipelineReport`].

use crate::config::StreamConfig;
use crate::pipeline::driver;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::filter::{
    ByteSink, ByteSource, Combiner, FilterBehavior, FilterCore, FilterKind, Router, Transform,
};
use crate::pipeline::id::{EdgeId, FilterId};
use crate::pipeline::port::{channel, PortDirection};
use crate::pipeline::report::{FilterOutcome, FilterReport, PipelineReport};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// A directed connection from a producer's output to a consumer's input.
#[derive(Debug, Clone)]
pub struct Edge {
    pub id: EdgeId,
    pub producer: FilterId,
    pub consumer: FilterId,
}

/// A filter waiting to be started.
struct FilterSlot {
    core: FilterCore,
    behavior: FilterBehavior,
}

/// The filter graph under construction.
pub struct Pipeline {
    slots: Vec<FilterSlot>,
    edges: Vec<Edge>,
    /// Chunks per channel; 0 = unbounded.
    channel_capacity: usize,
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            edges: Vec::new(),
            channel_capacity: 0,
        }
    }

    /// Use bounded channels holding at most `capacity` chunks. `0` = unbounded.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn filter_count(&self) -> usize {
        self.slots.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn filter_name(&self, id: FilterId) -> Option<&str> {
        self.slots.get(id.index()).map(|slot| slot.core.name())
    }

    // ── Graph building ──

    pub fn add_source(&mut self, name: impl Into<String>, source: impl ByteSource + 'static) -> FilterId {
        self.push_slot(
            name.into(),
            Arc::new(StreamConfig::default()),
            FilterBehavior::Source(Box::new(source)),
        )
    }

    pub fn add_sink(&mut self, name: impl Into<String>, sink: impl ByteSink + 'static) -> FilterId {
        self.push_slot(
            name.into(),
            Arc::new(StreamConfig::default()),
            FilterBehavior::Sink(Box::new(sink)),
        )
    }

    pub fn add_simple(
        &mut self,
        name: impl Into<String>,
        config: impl Into<Arc<StreamConfig>>,
        transform: impl Transform + 'static,
    ) -> PipelineResult<FilterId> {
        self.add_filter(name, config, FilterBehavior::Simple(Box::new(transform)))
    }

    pub fn add_splitting(
        &mut self,
        name: impl Into<String>,
        config: impl Into<Arc<StreamConfig>>,
        router: impl Router + 'static,
    ) -> PipelineResult<FilterId> {
        self.add_filter(name, config, FilterBehavior::Splitting(Box::new(router)))
    }

    pub fn add_aggregating(
        &mut self,
        name: impl Into<String>,
        config: impl Into<Arc<StreamConfig>>,
        combiner: impl Combiner + 'static,
    ) -> PipelineResult<FilterId> {
        self.add_filter(name, config, FilterBehavior::Aggregating(Box::new(combiner)))
    }

    /// Add a filter with an already boxed behavior.
    ///
    /// Fails if the behavior requires an id its stream config has no length for.
    pub fn add_filter(
        &mut self,
        name: impl Into<String>,
        config: impl Into<Arc<StreamConfig>>,
        behavior: FilterBehavior,
    ) -> PipelineResult<FilterId> {
        let name = name.into();
        let config = config.into();
        if let Some(&id) = behavior.required_ids().iter().find(|&&id| !config.contains(id)) {
            return Err(PipelineError::UnknownMeasurement { filter: name, id });
        }
        Ok(self.push_slot(name, config, behavior))
    }

    fn push_slot(&mut self, name: String, config: Arc<StreamConfig>, behavior: FilterBehavior) -> FilterId {
        let id = FilterId(self.slots.len() as u32);
        let core = FilterCore::new(id, name, behavior.kind(), config);
        tracing::debug!(filter = %core.name(), id = %id, kind = %core.kind(), "Filter added");
        self.slots.push(FilterSlot { core, behavior });
        id
    }

    /// Connect the next free output of `producer` to the next free input of
    /// `consumer`.
    ///
    /// On a two-port side the first connection becomes `Side::One` and the
    /// second `Side::Two`.
    pub fn connect(&mut self, producer: FilterId, consumer: FilterId) -> PipelineResult<EdgeId> {
        self.slot(producer)?;
        self.slot(consumer)?;
        if producer == consumer {
            return Err(PipelineError::Configuration(format!(
                "filter '{}' cannot be connected to itself",
                self.slots[producer.index()].core.name()
            )));
        }
        if self
            .edges
            .iter()
            .any(|e| e.producer == producer && e.consumer == consumer)
        {
            return Err(PipelineError::DuplicateConnection {
                producer: self.slots[producer.index()].core.name().to_string(),
                consumer: self.slots[consumer.index()].core.name().to_string(),
            });
        }

        // check both ends before touching either so a failure leaves no half edge
        self.slots[producer.index()].core.check_capacity(PortDirection::Output)?;
        self.slots[consumer.index()].core.check_capacity(PortDirection::Input)?;

        let (output, input) = channel(producer, consumer, self.channel_capacity);
        self.slots[producer.index()].core.on_output_connected(output)?;
        self.slots[consumer.index()].core.on_input_connected(input)?;

        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge { id, producer, consumer });
        Ok(id)
    }

    fn slot(&self, id: FilterId) -> PipelineResult<&FilterSlot> {
        self.slots.get(id.index()).ok_or(PipelineError::UnknownFilter(id))
    }

    // ── Validation ──

    /// Topological order of the filters (Kahn's algorithm).
    pub fn execution_order(&self) -> PipelineResult<Vec<FilterId>> {
        let n = self.slots.len();
        let mut in_degree = vec![0u32; n];
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];

        for edge in &self.edges {
            adj[edge.producer.index()].push(edge.consumer.index());
            in_degree[edge.consumer.index()] += 1;
        }

        let mut queue: Vec<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(node) = queue.pop() {
            order.push(FilterId(node as u32));
            for &next in &adj[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push(next);
                }
            }
        }

        if order.len() != n {
            tracing::error!("Pipeline graph has a cycle: only {} of {} filters ordered", order.len(), n);
            return Err(PipelineError::CycleDetected);
        }
        Ok(order)
    }

    /// Check that every filter has all of its ports connected and the graph is a DAG.
    pub fn validate(&self) -> PipelineResult<Vec<FilterId>> {
        if self.slots.is_empty() {
            return Err(PipelineError::Configuration("pipeline has no filters".into()));
        }
        for slot in &self.slots {
            let core = &slot.core;
            let kind = core.kind();
            let checks = [
                (PortDirection::Input, core.input_count(), kind.max_inputs()),
                (PortDirection::Output, core.output_count(), kind.max_outputs()),
            ];
            for (direction, connected, required) in checks {
                if connected != required {
                    return Err(PipelineError::IncompleteWiring {
                        filter: core.name().to_string(),
                        kind,
                        direction,
                        connected,
                        required,
                    });
                }
            }
        }
        self.execution_order()
    }

    // ── Execution ──

    /// Validate and spawn one thread per filter.
    pub fn start(self) -> PipelineResult<RunningPipeline> {
        let order = self.validate()?;
        tracing::info!(
            filters = self.slots.len(),
            edges = self.edges.len(),
            "Starting pipeline"
        );

        let mut slots: Vec<Option<FilterSlot>> = self.slots.into_iter().map(Some).collect();
        let mut handles = Vec::with_capacity(slots.len());
        for id in order {
            let Some(slot) = slots[id.index()].take() else {
                continue;
            };
            handles.push(spawn_filter(slot)?);
        }

        Ok(RunningPipeline {
            handles,
            started: Instant::now(),
        })
    }

    /// Start and wait for every filter to finish.
    pub fn run(self) -> PipelineResult<PipelineReport> {
        Ok(self.start()?.join())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

struct FilterHandle {
    id: FilterId,
    name: String,
    kind: FilterKind,
    handle: JoinHandle<FilterReport>,
}

fn spawn_filter(slot: FilterSlot) -> PipelineResult<FilterHandle> {
    let FilterSlot { core, behavior } = slot;
    let id = core.id();
    let name = core.name().to_string();
    let kind = core.kind();
    let span = tracing::info_span!("filter", name = %name, id = id.0);

    let handle = thread::Builder::new()
        .name(format!("filter-{}", name))
        .spawn(move || {
            let _entered = span.enter();
            run_filter(core, behavior)
        })?;

    Ok(FilterHandle {
        id,
        name,
        kind,
        handle,
    })
}

/// Body of a filter thread.
fn run_filter(mut core: FilterCore, mut behavior: FilterBehavior) -> FilterReport {
    tracing::info!(kind = %core.kind(), "Filter started");
    let outcome = match driver::drive(&mut core, &mut behavior) {
        Ok(()) => FilterOutcome::Completed,
        Err(e) => {
            tracing::error!(error = %e, "Filter failed, closing its ports");
            FilterOutcome::Failed(e.to_string())
        }
    };
    core.close_all();

    let stats = core.stats();
    tracing::info!(
        records_in = stats.records_in,
        records_out = stats.records_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        "Filter finished"
    );
    FilterReport::from_core(&core, outcome)
}

/// Handle on a started pipeline.
pub struct RunningPipeline {
    handles: Vec<FilterHandle>,
    started: Instant,
}

impl RunningPipeline {
    pub fn filter_count(&self) -> usize {
        self.handles.len()
    }

    /// Block until every filter thread has exited.
    pub fn join(self) -> PipelineReport {
        let mut reports = Vec::with_capacity(self.handles.len());
        for FilterHandle { id, name, kind, handle } in self.handles {
            let report = handle.join().unwrap_or_else(|_| {
                let err = PipelineError::ThreadPanicked(name.clone());
                tracing::error!(filter = %name, "{}", err);
                FilterReport::panicked(id, &name, kind, err.to_string())
            });
            reports.push(report);
        }
        let report = PipelineReport::new(reports, self.started.elapsed());
        if report.is_success() {
            tracing::info!(elapsed_ms = report.elapsed_ms, "Pipeline finished");
        } else {
            tracing::warn!(
                failed = report.failures().count(),
                elapsed_ms = report.elapsed_ms,
                "Pipeline finished with failures"
            );
        }
        report
    }
}
