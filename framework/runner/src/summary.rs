use std::time::Duration;

use chrono::{DateTime, Utc};
use mongoperf_instruments::prelude::Report;
use mongoperf_summary_model::{OperationSummary, RunSummary};

/// Project a report onto the persisted run summary.
///
/// When `run_id` is not given a random one is generated.
pub fn summarize_run(
    report: &Report,
    run_id: Option<String>,
    started_at: DateTime<Utc>,
    run_duration: Option<Duration>,
) -> RunSummary {
    let mut summary = RunSummary::new(
        run_id.unwrap_or_else(|| nanoid::nanoid!()),
        started_at.timestamp(),
        run_duration.map(|d| d.as_secs()),
        report.connection_target.clone(),
        report.database.clone(),
        report.collection.clone(),
        report.parallelism,
        report.buffer_size,
        env!("CARGO_PKG_VERSION").to_string(),
    );

    for (name, stat) in &report.queries {
        summary.add_operation(
            name.clone(),
            OperationSummary {
                action: stat.action.to_string(),
                query_count: stat.query_count,
                change_count: stat.change_count,
                error_count: stat.error_count,
                total_duration_ms: stat.duration_total.as_secs_f64() * 1000.0,
                last_error: stat.last_error.as_ref().map(|e| e.to_string()),
            },
        );
    }
    for (name, reason) in &report.skipped {
        summary.add_skipped(name.clone(), reason.clone());
    }
    summary.set_cancelled(report.cancelled);

    summary
}
