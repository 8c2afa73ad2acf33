//! Built-in filter policies and adapters.

pub mod altitude;
pub mod convert;
pub mod drop;
pub mod io;
pub mod line;
pub mod tap;
pub mod time_sort;
pub mod wild_point;

pub use altitude::AltitudeSplitter;
pub use convert::{Conversion, NumericFormatter, TimeFormatter};
pub use drop::FieldDropFilter;
pub use io::{FileSink, FileSource, MemorySink, MemorySource, NullSink};
pub use line::LineFormatter;
pub use tap::TraceTap;
pub use time_sort::TimeSortMerger;
pub use wild_point::{Emission, WildPointFilter, WildPointLayout, WildPointState};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::StreamConfig;
    use crate::pipeline::filter::{FilterCore, FilterKind, Router, SplitOutputs};
    use crate::pipeline::id::FilterId;
    use crate::pipeline::port::{channel, InputPort};
    use crate::pipeline::record::Record;
    use std::sync::Arc;

    fn collect(mut input: InputPort) -> Vec<Record> {
        let config = StreamConfig::default();
        std::iter::from_fn(|| input.read_record(&config).unwrap()).collect()
    }

    /// Push `records` through `router` and return what reached each output.
    pub fn route_all(router: &mut dyn Router, records: Vec<Record>) -> (Vec<Record>, Vec<Record>) {
        let mut core = FilterCore::new(
            FilterId(0),
            "router-under-test",
            FilterKind::Splitting,
            Arc::new(StreamConfig::default()),
        );
        let (out_one, in_one) = channel(FilterId(0), FilterId(1), 0);
        let (out_two, in_two) = channel(FilterId(0), FilterId(2), 0);
        core.on_output_connected(out_one).unwrap();
        core.on_output_connected(out_two).unwrap();

        for record in records {
            router.route(record, &mut SplitOutputs::new(&mut core)).unwrap();
        }
        router.on_end_of_stream(&mut SplitOutputs::new(&mut core)).unwrap();
        core.close_all();
        (collect(in_one), collect(in_two))
    }
}
