//! Out-of-band run results.
//!
//! Downstream filters only ever see an upstream failure as an early
//! end-of-stream. The report collected at `join` time keeps each filter's
//! own outcome so a crash can be told apart from a clean finish.

use crate::pipeline::filter::{FilterCore, FilterKind, FilterState, FilterStats};
use crate::pipeline::id::FilterId;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// How a filter thread ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum FilterOutcome {
    Completed,
    Failed(String),
}

impl FilterOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, FilterOutcome::Completed)
    }
}

/// Final counters and outcome of one filter.
#[derive(Debug, Clone, Serialize)]
pub struct FilterReport {
    pub id: FilterId,
    pub name: String,
    pub kind: FilterKind,
    pub final_state: FilterState,
    #[serde(flatten)]
    pub stats: FilterStats,
    pub outcome: FilterOutcome,
}

impl FilterReport {
    pub fn from_core(core: &FilterCore, outcome: FilterOutcome) -> Self {
        Self {
            id: core.id(),
            name: core.name().to_string(),
            kind: core.kind(),
            final_state: core.state(),
            stats: core.stats(),
            outcome,
        }
    }

    /// Report for a filter whose thread never handed back its state.
    pub fn panicked(id: FilterId, name: &str, kind: FilterKind, message: String) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            final_state: FilterState::Closed,
            stats: FilterStats::default(),
            outcome: FilterOutcome::Failed(message),
        }
    }
}

/// Per-filter reports of one pipeline run, in filter id order.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub filters: Vec<FilterReport>,
    pub elapsed_ms: u64,
}

impl PipelineReport {
    pub fn new(mut filters: Vec<FilterReport>, elapsed: Duration) -> Self {
        filters.sort_by_key(|f| f.id);
        Self {
            filters,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    pub fn is_success(&self) -> bool {
        self.filters.iter().all(|f| f.outcome.is_completed())
    }

    pub fn failures(&self) -> impl Iterator<Item = &FilterReport> {
        self.filters.iter().filter(|f| !f.outcome.is_completed())
    }

    pub fn filter(&self, name: &str) -> Option<&FilterReport> {
        self.filters.iter().find(|f| f.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<28} {:<12} {:>10} {:>10} {:>12} {:>12}  outcome",
            "filter", "kind", "rec in", "rec out", "bytes in", "bytes out"
        )?;
        for r in &self.filters {
            let outcome = match &r.outcome {
                FilterOutcome::Completed => "completed".to_string(),
                FilterOutcome::Failed(msg) => format!("FAILED: {}", msg),
            };
            writeln!(
                f,
                "{:<28} {:<12} {:>10} {:>10} {:>12} {:>12}  {}",
                r.name,
                r.kind.to_string(),
                r.stats.records_in,
                r.stats.records_out,
                r.stats.bytes_in,
                r.stats.bytes_out,
                outcome
            )?;
        }
        write!(f, "finished in {} ms", self.elapsed_ms)
    }
}
