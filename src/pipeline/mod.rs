//! Pipe-and-filter stream engine.
//!
//! Records flow as bytes through a static DAG of filters. Every filter runs
//! on its own thread and talks to its neighbours over crossbeam channels.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──► [Simple] ──► [Splitting] ──► [Simple] ──► [Sink]
//!                                      └──► [Aggregating] ◄── [Source]
//! ```
//!
//! # Design
//!
//! - **Byte streams, not messages** - records are `[id][payload]` with no
//!   delimiter; each filter decodes with the stream config valid at its
//!   position.
//! - **Closure is end-of-stream** - a producer drops its sender when it
//!   finishes or fails; consumers drain what is buffered first.
//! - **Policies, not subclasses** - each filter kind has one driver loop
//!   parameterized by a small trait (`Transform`, `Router`, `Combiner`).
//! - **Static topology** - wiring is validated once in `start`; nothing is
//!   reconfigured afterwards.

pub mod driver;
pub mod error;
pub mod executor;
pub mod filter;
pub mod filters;
pub mod frame;
pub mod id;
pub mod port;
pub mod record;
pub mod report;

pub use error::{PipelineError, PipelineResult};
pub use executor::{Edge, Pipeline, RunningPipeline};
pub use filter::{
    ByteSink, ByteSource, Combiner, FilterBehavior, FilterCore, FilterKind, FilterState,
    FilterStats, Router, SplitOutputs, Transform,
};
pub use frame::{DataFrame, FrameLayout};
pub use id::{EdgeId, FilterId, Side};
pub use port::{InputPort, OutputPort, PortDirection};
pub use record::Record;
pub use report::{FilterOutcome, FilterReport, PipelineReport};
