mod operations_table;

use std::fmt::Write;

use tabled::settings::Style;
use tabled::Table;

use crate::report::summary_report::operations_table::OperationRow;
use crate::report::Report;

/// Render the scenario configuration followed by one table row per operation.
pub fn render_summary(report: &Report) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "Scenario configuration");
    let _ = writeln!(out, "  Produced by: mongoperf {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "  Connection:  {}", report.connection_target);
    let _ = writeln!(out, "  Database:    {}", report.database);
    let _ = writeln!(out, "  Collection:  {}", report.collection);
    let _ = writeln!(out, "  Parallel:    {}", report.parallelism);
    let _ = writeln!(out, "  BufferSize:  {}", report.buffer_size);
    let _ = writeln!(out, "  Elapsed:     {:.2}s", report.elapsed.as_secs_f64());
    if report.cancelled {
        let _ = writeln!(out, "  Stopped early, results are partial");
    }

    let _ = writeln!(out, "\nSummary of operations");
    let rows = report
        .queries
        .values()
        .map(OperationRow::from)
        .collect::<Vec<_>>();
    let mut table = Table::new(&rows);
    table.with(Style::modern());
    let _ = writeln!(out, "{}", table);

    if !report.skipped.is_empty() {
        let _ = writeln!(out, "\nSkipped operations");
        for (name, reason) in &report.skipped {
            let _ = writeln!(out, "  {}: {}", name, reason);
        }
    }

    out
}

pub fn print_summary(report: &Report) {
    println!("\n{}", render_summary(report));
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use mongoperf_core::prelude::{ActionKind, OperationError};

    use crate::aggregator::AggregatedStat;

    use super::*;

    fn report() -> Report {
        let mut insert = AggregatedStat::new("insert-seed", ActionKind::InsertOne);
        insert.query_count = 3;
        insert.change_count = 3;
        insert.duration_total = Duration::from_millis(6);

        let mut lookup = AggregatedStat::new("lookup", ActionKind::FindOne);
        lookup.query_count = 2;
        lookup.error_count = 2;
        lookup.last_error = Some(OperationError::NotFound);

        Report {
            connection_target: "mongodb://localhost:27017".to_string(),
            database: "perf".to_string(),
            collection: "items".to_string(),
            parallelism: 2,
            buffer_size: 10,
            queries: BTreeMap::from([
                ("insert-seed".to_string(), insert),
                ("lookup".to_string(), lookup),
            ]),
            skipped: BTreeMap::from([(
                "purge".to_string(),
                "action not supported: DeleteMany".to_string(),
            )]),
            cancelled: false,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn summary_lists_configuration_and_operations() {
        let rendered = render_summary(&report());

        assert!(rendered.contains(&format!(
            "Produced by: mongoperf {}",
            env!("CARGO_PKG_VERSION")
        )));
        assert!(rendered.contains("Database:    perf"));
        assert!(rendered.contains("Collection:  items"));
        assert!(rendered.contains("Parallel:    2"));
        assert!(rendered.contains("insert-seed"));
        assert!(rendered.contains("InsertOne"));
        assert!(rendered.contains("no document matched the filter"));
        assert!(rendered.contains("purge: action not supported: DeleteMany"));
        assert!(!rendered.contains("results are partial"));
    }

    #[test]
    fn cancelled_run_is_flagged() {
        let mut report = report();
        report.cancelled = true;

        assert!(render_summary(&report).contains("Stopped early, results are partial"));
    }

    #[test]
    fn report_totals() {
        let report = report();
        assert_eq!(5, report.total_outcomes());
        assert_eq!(2, report.total_errors());
        assert_eq!(3, report.query("insert-seed").unwrap().change_count);
        assert!(report.query("purge").is_none());
    }
}
