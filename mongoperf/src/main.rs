use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mongodb_store::prelude::MongoStore;
use mongoperf_runner::prelude::{
    init, load_scenario_file, print_summary, run, summarize_run, DynStore, InMemoryStore,
    MongoperfResult, RunOptions,
};
use mongoperf_summary_model::append_run_summary;

fn main() -> MongoperfResult<()> {
    let cli = init();

    let scenario = load_scenario_file(&cli.scenario)?;
    log::info!(
        "Loaded scenario {} with {} queries",
        cli.scenario.display(),
        scenario.operations.len()
    );

    let options = RunOptions {
        duration: cli.duration.map(Duration::from_secs),
        no_progress: cli.no_progress,
    };
    let started_at = chrono::Utc::now();

    let report = if cli.in_memory {
        log::info!("Running against the in-memory store");
        run(&options, scenario, || async {
            Ok(Arc::new(InMemoryStore::new()) as DynStore)
        })?
    } else {
        let uri = cli.uri.clone();
        run(&options, scenario, move || MongoStore::connect_dyn(uri))?
    };

    print_summary(&report);

    if let Some(summary_file) = &cli.summary_file {
        let summary = summarize_run(&report, cli.run_id.clone(), started_at, options.duration);
        append_run_summary(&summary, summary_file).with_context(|| {
            format!("Failed to write run summary to {}", summary_file.display())
        })?;
        log::info!(
            "Appended run {} with fingerprint {} to {}",
            summary.run_id,
            summary.fingerprint(),
            summary_file.display()
        );
    }

    Ok(())
}
