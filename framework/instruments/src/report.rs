mod summary_report;

use std::collections::BTreeMap;
use std::time::Duration;

use crate::aggregator::AggregatedStat;

pub use summary_report::{print_summary, render_summary};

/// The result of a scenario run, built once the outcome pipeline has drained.
#[derive(Debug, Clone)]
pub struct Report {
    /// Where the store was reached, with any credentials removed.
    pub connection_target: String,
    pub database: String,
    pub collection: String,
    pub parallelism: usize,
    pub buffer_size: usize,
    /// Statistics keyed by operation name.
    pub queries: BTreeMap<String, AggregatedStat>,
    /// Operations that could not be built, keyed by name, with the reason.
    pub skipped: BTreeMap<String, String>,
    /// Set when the run was stopped by a deadline or an interrupt rather than running to completion.
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl Report {
    pub fn query(&self, name: &str) -> Option<&AggregatedStat> {
        self.queries.get(name)
    }

    pub fn total_outcomes(&self) -> u64 {
        self.queries.values().map(|stat| stat.query_count).sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.queries.values().map(|stat| stat.error_count).sum()
    }
}
