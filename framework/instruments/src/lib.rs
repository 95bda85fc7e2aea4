mod aggregator;
mod outcome;
mod report;

pub mod prelude {
    pub use crate::aggregator::{AggregatedStat, ResultAggregator};
    pub use crate::outcome::{OperationOutcome, OperationRecord};
    pub use crate::report::{print_summary, render_summary, Report};
}
