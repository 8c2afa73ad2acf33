//! # telepipe: pipe-and-filter telemetry processing
//!
//! Flight telemetry arrives as a byte stream of `[id][payload]` records with no
//! delimiters. telepipe runs it through a static graph of filters, each on its
//! own thread, to convert units, correct wild pressure readings, merge streams
//! by time and split them by altitude.
//!
//! ## Architecture
//!
//! - **Pipeline**: filters, ports, records and the executor ([`pipeline`])
//! - **Filters**: concrete transforms, routers and combiners ([`pipeline::filters`])
//! - **Plumbers**: the three deployed topologies ([`plumber`])
//! - **Communication**: crossbeam channels between filter threads
//!
//! ## Example
//!
//! ```ignore
//! use telepipe::{config::PipelineConfig, plumber, System};
//!
//! fn main() -> telepipe::Result<()> {
//!     let config = PipelineConfig::load("telepipe.toml")?;
//!     let report = plumber::build_from_files(System::A, &config)?.run()?;
//!     println!("{}", report);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod plumber;
pub mod types;

pub use config::{PipelineConfig, StreamConfig, StreamConfigBuilder};
pub use error::{Result, ResultExt, TelepipeError};
pub use pipeline::{Pipeline, PipelineError, PipelineReport, Record};
pub use plumber::System;
pub use types::MeasurementId;
