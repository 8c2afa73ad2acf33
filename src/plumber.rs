//! Deployed pipeline topologies.
//!
//! Each `system_*` function wires a complete pipeline around caller-supplied
//! sources and sinks; [`build_from_files`] binds them to the files named in
//! the `[io]` section.
//!
//! ```text
//! A: src → drop → time → temp → alt(m) → line ─────────────────────────► out
//!
//! B: src → drop → wild ─(1)→ keep{t,p} → time → p fmt → line ──────────► wild
//!                      └(2)→ time → temp → alt(m) → p fmt → line ──────► out
//!
//! C: src a → drop ─┐
//!                  ├→ sort → alt split ─(1)→ drop p → time → alt(ft) → line → below
//!    src b → drop ─┘                   └(2)→ drop alt → wild ─(1)→ null
//!                                                            └(2)→ time → p fmt → line → pressure
//! ```
//!
//! Every filter gets the length table valid at its position: raw fields are
//! 8 bytes until a formatter rewrites them.

use crate::config::{PipelineConfig, StreamConfig, StreamConfigBuilder};
use crate::error::{Result, ResultExt};
use crate::pipeline::error::PipelineResult;
use crate::pipeline::filter::{ByteSink, ByteSource};
use crate::pipeline::filters::convert::{ALTITUDE_WIDTH, PRESSURE_WIDTH, TEMPERATURE_WIDTH, TIME_WIDTH};
use crate::pipeline::filters::{
    AltitudeSplitter, FieldDropFilter, FileSink, FileSource, LineFormatter, NullSink,
    NumericFormatter, TimeFormatter, TimeSortMerger, WildPointFilter,
};
use crate::pipeline::{FilterId, Pipeline};
use crate::types::MeasurementId::{self, *};
use std::fmt;
use std::sync::Arc;

/// The three deployed topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum System {
    /// Unit conversion of the full flight record
    A,
    /// Pressure wild-point correction
    B,
    /// Two-stream merge split by altitude
    C,
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            System::A => f.write_str("A"),
            System::B => f.write_str("B"),
            System::C => f.write_str("C"),
        }
    }
}

/// Length tables along a formatting chain.
struct Positions {
    raw: Arc<StreamConfig>,
    time_formatted: Arc<StreamConfig>,
}

impl Positions {
    fn new() -> PipelineResult<Self> {
        let raw = StreamConfig::default();
        let time_formatted = raw.to_builder().with_length(Time, TIME_WIDTH).build()?;
        Ok(Self {
            raw: Arc::new(raw),
            time_formatted: Arc::new(time_formatted),
        })
    }

    /// Time formatted plus every `(id, width)` in `formatted`.
    fn formatted(&self, formatted: &[(MeasurementId, usize)]) -> PipelineResult<Arc<StreamConfig>> {
        let builder = formatted
            .iter()
            .fold(self.time_formatted.to_builder(), |b, &(id, width)| b.with_length(id, width));
        Ok(Arc::new(builder.build()?))
    }
}

/// Connect `ids` in sequence.
fn link(pipeline: &mut Pipeline, ids: &[FilterId]) -> PipelineResult<()> {
    for pair in ids.windows(2) {
        pipeline.connect(pair[0], pair[1])?;
    }
    Ok(())
}

fn time_formatter(config: &PipelineConfig) -> PipelineResult<TimeFormatter> {
    TimeFormatter::new(config.format.time_format.as_str())
}

/// System A: time, temperature (°C) and altitude (m) as text lines.
pub fn system_a(
    config: &PipelineConfig,
    source: impl ByteSource + 'static,
    sink: impl ByteSink + 'static,
) -> PipelineResult<Pipeline> {
    let pos = Positions::new()?;
    let mut p = Pipeline::new().with_channel_capacity(config.pipeline.channel_capacity);

    let src = p.add_source("a.source", source);
    let drop = p.add_simple(
        "a.drop",
        pos.raw.clone(),
        FieldDropFilter::dropping(&[Attitude, Pressure, Velocity]),
    )?;
    let time = p.add_simple("a.time", pos.raw.clone(), time_formatter(config)?)?;
    let temp = p.add_simple(
        "a.temperature",
        pos.time_formatted.clone(),
        NumericFormatter::temperature_celsius(),
    )?;
    let alt = p.add_simple(
        "a.altitude",
        pos.formatted(&[(Temperature, TEMPERATURE_WIDTH)])?,
        NumericFormatter::altitude_meters(),
    )?;
    let line = p.add_simple(
        "a.line",
        pos.formatted(&[(Temperature, TEMPERATURE_WIDTH), (Altitude, ALTITUDE_WIDTH)])?,
        LineFormatter::new(&[Time, Temperature, Altitude]),
    )?;
    let out = p.add_sink("a.output", sink);

    link(&mut p, &[src, drop, time, temp, alt, line, out])?;
    Ok(p)
}

/// System B: wild pressure points to one file, corrected full records to another.
pub fn system_b(
    config: &PipelineConfig,
    source: impl ByteSource + 'static,
    output_sink: impl ByteSink + 'static,
    wild_sink: impl ByteSink + 'static,
) -> PipelineResult<Pipeline> {
    let pos = Positions::new()?;
    let mut p = Pipeline::new().with_channel_capacity(config.pipeline.channel_capacity);

    let src = p.add_source("b.source", source);
    let drop = p.add_simple(
        "b.drop",
        pos.raw.clone(),
        FieldDropFilter::dropping(&[Attitude, Velocity]),
    )?;
    let mut wild_filter = WildPointFilter::full(config.wild_point.threshold_psi);
    if config.wild_point.negate_corrected {
        wild_filter = wild_filter.with_negated_corrections();
    }
    let wild = p.add_splitting("b.wild_point", pos.raw.clone(), wild_filter)?;
    link(&mut p, &[src, drop, wild])?;

    // wild branch, connected first so it binds output one
    let w_keep = p.add_simple(
        "b.wild.keep",
        pos.raw.clone(),
        FieldDropFilter::keeping(&[Time, Pressure]),
    )?;
    let w_time = p.add_simple("b.wild.time", pos.raw.clone(), time_formatter(config)?)?;
    let w_pressure = p.add_simple(
        "b.wild.pressure",
        pos.time_formatted.clone(),
        NumericFormatter::pressure(),
    )?;
    let w_line = p.add_simple(
        "b.wild.line",
        pos.formatted(&[(Pressure, PRESSURE_WIDTH)])?,
        LineFormatter::new(&[Time, Pressure]),
    )?;
    let w_out = p.add_sink("b.wild.output", wild_sink);
    link(&mut p, &[wild, w_keep, w_time, w_pressure, w_line, w_out])?;

    // valid branch
    let v_time = p.add_simple("b.valid.time", pos.raw.clone(), time_formatter(config)?)?;
    let v_temp = p.add_simple(
        "b.valid.temperature",
        pos.time_formatted.clone(),
        NumericFormatter::temperature_celsius(),
    )?;
    let v_alt = p.add_simple(
        "b.valid.altitude",
        pos.formatted(&[(Temperature, TEMPERATURE_WIDTH)])?,
        NumericFormatter::altitude_meters(),
    )?;
    let v_pressure = p.add_simple(
        "b.valid.pressure",
        pos.formatted(&[(Temperature, TEMPERATURE_WIDTH), (Altitude, ALTITUDE_WIDTH)])?,
        NumericFormatter::pressure(),
    )?;
    let v_line = p.add_simple(
        "b.valid.line",
        pos.formatted(&[
            (Temperature, TEMPERATURE_WIDTH),
            (Altitude, ALTITUDE_WIDTH),
            (Pressure, PRESSURE_WIDTH),
        ])?,
        LineFormatter::new(&[Time, Temperature, Altitude, Pressure]),
    )?;
    let v_out = p.add_sink("b.valid.output", output_sink);
    link(&mut p, &[wild, v_time, v_temp, v_alt, v_pressure, v_line, v_out])?;

    Ok(p)
}

/// System C: merge two streams by time, then split by altitude.
///
/// Low frames become time/altitude lines. High frames go through wild-point
/// correction; their wild readings are handed to `wild_sink` and the valid
/// stream becomes time/pressure lines.
pub fn system_c(
    config: &PipelineConfig,
    source_a: impl ByteSource + 'static,
    source_b: impl ByteSource + 'static,
    below_sink: impl ByteSink + 'static,
    pressure_sink: impl ByteSink + 'static,
    wild_sink: impl ByteSink + 'static,
) -> PipelineResult<Pipeline> {
    let pos = Positions::new()?;
    let mut p = Pipeline::new().with_channel_capacity(config.pipeline.channel_capacity);
    let dropped = [Attitude, Temperature, Velocity];

    let src_a = p.add_source("c.source_a", source_a);
    let drop_a = p.add_simple("c.drop_a", pos.raw.clone(), FieldDropFilter::dropping(&dropped))?;
    let src_b = p.add_source("c.source_b", source_b);
    let drop_b = p.add_simple("c.drop_b", pos.raw.clone(), FieldDropFilter::dropping(&dropped))?;
    let sort = p.add_aggregating("c.time_sort", pos.raw.clone(), TimeSortMerger::new())?;
    let split = p.add_splitting(
        "c.altitude_split",
        pos.raw.clone(),
        AltitudeSplitter::new(config.altitude.threshold_feet),
    )?;
    link(&mut p, &[src_a, drop_a, sort])?;
    link(&mut p, &[src_b, drop_b, sort])?;
    link(&mut p, &[sort, split])?;

    // below the threshold
    let l_drop = p.add_simple("c.low.drop", pos.raw.clone(), FieldDropFilter::dropping(&[Pressure]))?;
    let l_time = p.add_simple("c.low.time", pos.raw.clone(), time_formatter(config)?)?;
    let l_alt = p.add_simple(
        "c.low.altitude",
        pos.time_formatted.clone(),
        NumericFormatter::altitude_feet(),
    )?;
    let l_line = p.add_simple(
        "c.low.line",
        pos.formatted(&[(Altitude, ALTITUDE_WIDTH)])?,
        LineFormatter::new(&[Time, Altitude]),
    )?;
    let l_out = p.add_sink("c.low.output", below_sink);
    link(&mut p, &[split, l_drop, l_time, l_alt, l_line, l_out])?;

    // at or above the threshold
    let h_drop = p.add_simple("c.high.drop", pos.raw.clone(), FieldDropFilter::dropping(&[Altitude]))?;
    let h_wild = p.add_splitting(
        "c.high.wild_point",
        pos.raw.clone(),
        WildPointFilter::pressure_only(config.wild_point.threshold_psi),
    )?;
    link(&mut p, &[split, h_drop, h_wild])?;

    let h_junk = p.add_sink("c.high.wild", wild_sink);
    link(&mut p, &[h_wild, h_junk])?;

    let h_time = p.add_simple("c.high.time", pos.raw.clone(), time_formatter(config)?)?;
    let h_pressure = p.add_simple(
        "c.high.pressure",
        pos.time_formatted.clone(),
        NumericFormatter::pressure(),
    )?;
    let h_line = p.add_simple(
        "c.high.line",
        pos.formatted(&[(Pressure, PRESSURE_WIDTH)])?,
        LineFormatter::new(&[Time, Pressure]),
    )?;
    let h_out = p.add_sink("c.high.output", pressure_sink);
    link(&mut p, &[h_wild, h_time, h_pressure, h_line, h_out])?;

    Ok(p)
}

/// Build `system` over the files named in `config.io`.
pub fn build_from_files(system: System, config: &PipelineConfig) -> Result<Pipeline> {
    let io = &config.io;
    let open = |path: &std::path::Path| {
        let path = io.resolve(path);
        FileSource::open(&path).with_context(|| format!("Opening input {}", path.display()))
    };
    let create = |path: &std::path::Path| {
        let path = io.resolve(path);
        FileSink::create(&path).with_context(|| format!("Creating output {}", path.display()))
    };

    let pipeline = match system {
        System::A => system_a(config, open(&io.flight_data)?, create(&io.output_a)?),
        System::B => system_b(
            config,
            open(&io.flight_data)?,
            create(&io.output_b)?,
            create(&io.wild_points)?,
        ),
        System::C => system_c(
            config,
            open(&io.subset_a)?,
            open(&io.subset_b)?,
            create(&io.below_threshold)?,
            create(&io.pressure_wild_points)?,
            NullSink::new(),
        ),
    };
    pipeline.with_context(|| format!("Assembling system {}", system))
}
