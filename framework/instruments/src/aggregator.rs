use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mongoperf_core::prelude::{ActionKind, OperationError};
use tokio::sync::mpsc::Receiver;

use crate::outcome::OperationOutcome;

/// Running statistics for one named operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedStat {
    pub name: String,
    pub action: ActionKind,
    /// Number of recorded invocations, successful or not.
    pub query_count: u64,
    /// Sum of the store call durations of every recorded invocation.
    pub duration_total: Duration,
    /// Sum of documents created, updated or returned.
    pub change_count: u64,
    pub error_count: u64,
    pub last_error: Option<OperationError>,
}

impl AggregatedStat {
    pub fn new(name: &str, action: ActionKind) -> Self {
        Self {
            name: name.to_string(),
            action,
            query_count: 0,
            duration_total: Duration::ZERO,
            change_count: 0,
            error_count: 0,
            last_error: None,
        }
    }

    /// Fold one outcome into the statistics.
    ///
    /// All four counters move together under the exclusive borrow, so a reader never sees a
    /// partially applied outcome.
    pub fn update(&mut self, outcome: &OperationOutcome) {
        self.query_count += 1;
        self.duration_total += outcome.duration();
        self.change_count += outcome.change_count();
        if let Some(e) = outcome.error() {
            self.error_count += 1;
            self.last_error = Some(e.clone());
        }
    }

    pub fn success_count(&self) -> u64 {
        self.query_count - self.error_count
    }

    /// An operation is reported as unsuccessful as soon as one invocation failed.
    pub fn is_successful(&self) -> bool {
        self.error_count == 0
    }

    pub fn average_duration(&self) -> Option<Duration> {
        u32::try_from(self.query_count)
            .ok()
            .filter(|count| *count > 0)
            .map(|count| self.duration_total / count)
    }
}

/// Single writer fold of operation outcomes into per-operation statistics.
///
/// The aggregator owns its map. Nothing else reads the statistics until [ResultAggregator::drain]
/// has returned and the map has been handed over with [ResultAggregator::into_stats].
#[derive(Debug, Default)]
pub struct ResultAggregator {
    stats: HashMap<Arc<str>, AggregatedStat>,
    recorded: Arc<AtomicU64>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the number of recorded outcomes through `counter`, for progress display.
    pub fn with_progress_counter(mut self, counter: Arc<AtomicU64>) -> Self {
        self.recorded = counter;
        self
    }

    pub fn record(&mut self, outcome: OperationOutcome) {
        self.stats
            .entry(outcome.shared_name().clone())
            .or_insert_with(|| AggregatedStat::new(outcome.operation_name(), outcome.action()))
            .update(&outcome);
        self.recorded.fetch_add(1, Ordering::Relaxed);
    }

    /// Receive outcomes until every sender of the result queue has been dropped.
    pub async fn drain(mut self, mut results: Receiver<OperationOutcome>) -> Self {
        while let Some(outcome) = results.recv().await {
            self.record(outcome);
        }

        log::debug!("Result queue closed after {} outcomes", self.total_recorded());

        self
    }

    pub fn total_recorded(&self) -> u64 {
        self.stats.values().map(|stat| stat.query_count).sum()
    }

    pub fn into_stats(self) -> BTreeMap<String, AggregatedStat> {
        self.stats
            .into_values()
            .map(|stat| (stat.name.clone(), stat))
            .collect()
    }
}
