use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mongoperf_core::prelude::ShutdownHandle;
use mongoperf_instruments::prelude::{Report, ResultAggregator};
use tokio::sync::mpsc;

use crate::context::RunnerContext;
use crate::definition::ScenarioDefinition;
use crate::dispatcher::Dispatcher;
use crate::error::{ConfigError, ConnectionError, RunError};
use crate::operation::Operation;
use crate::progress::{start_progress, ProgressPlan};
use crate::shutdown::start_shutdown_listener;
use crate::store::DynStore;
use crate::worker::spawn_workers;

/// Options that apply to a whole run rather than to the scenario.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Stop dispatching once this much time has passed.
    pub duration: Option<Duration>,
    /// Do not show a progress display on the CLI.
    pub no_progress: bool,
}

/// Run a scenario to completion, or until the context's shutdown handle fires.
///
/// Returns once every dispatched invocation has been executed and aggregated. A cancelled run still
/// returns a report, covering the work that was done.
pub async fn run_scenario(
    context: &RunnerContext,
    definition: &ScenarioDefinition,
) -> Result<Report, RunError> {
    definition.validate()?;
    let started = Instant::now();

    let mut operations = Vec::with_capacity(definition.operations.len());
    let mut skipped = BTreeMap::new();
    for operation_definition in &definition.operations {
        match Operation::from_definition(operation_definition) {
            Ok(operation) => {
                operations.push((Arc::new(operation), operation_definition.repeat_policy()?))
            }
            Err(e) => {
                log::error!("Skipping query {}: {}", operation_definition.name, e);
                skipped.insert(operation_definition.name.clone(), e.to_string());
            }
        }
    }
    if operations.is_empty() {
        return Err(ConfigError::NoRunnableOperations.into());
    }

    log::info!(
        "Running {} queries against {}.{} with {} workers",
        operations.len(),
        definition.database,
        definition.collection,
        definition.parallelism
    );

    let collection = context
        .store()
        .collection(&definition.database, &definition.collection);
    let (queue_tx, queue_rx) = mpsc::channel(definition.buffer_size);
    let (results_tx, results_rx) = mpsc::channel(definition.parallelism);

    let aggregator = tokio::spawn(
        ResultAggregator::new()
            .with_progress_counter(context.completed_counter())
            .drain(results_rx),
    );
    let workers = spawn_workers(
        definition.parallelism,
        queue_rx,
        results_tx,
        collection,
        context.shutdown_handle(),
    );
    let dispatcher = Dispatcher::start(operations, queue_tx, context.shutdown_handle());

    let cancelled = dispatcher.join().await?;
    for worker in workers {
        worker.await?;
    }
    let queries = aggregator.await?.into_stats();

    let report = Report {
        connection_target: context.store().connection_target(),
        database: definition.database.clone(),
        collection: definition.collection.clone(),
        parallelism: definition.parallelism,
        buffer_size: definition.buffer_size,
        queries,
        skipped,
        cancelled,
        elapsed: started.elapsed(),
    };
    log::info!(
        "Scenario finished after {:?} with {} outcomes",
        report.elapsed,
        report.total_outcomes()
    );

    Ok(report)
}

/// Run a scenario on a runtime created for the purpose.
///
/// The store is obtained from `connect` once the runtime is up. Ctrl-C and the configured duration
/// both stop the run early.
pub fn run<C, F>(
    options: &RunOptions,
    definition: ScenarioDefinition,
    connect: C,
) -> Result<Report, RunError>
where
    C: FnOnce() -> F,
    F: Future<Output = Result<DynStore, ConnectionError>>,
{
    definition.validate()?;

    let runtime = tokio::runtime::Runtime::new().map_err(RunError::Runtime)?;
    let shutdown_handle = start_shutdown_listener(&runtime);

    runtime.block_on(connect_and_run(options, &definition, connect, shutdown_handle))
}

async fn connect_and_run<C, F>(
    options: &RunOptions,
    definition: &ScenarioDefinition,
    connect: C,
    shutdown_handle: ShutdownHandle,
) -> Result<Report, RunError>
where
    C: FnOnce() -> F,
    F: Future<Output = Result<DynStore, ConnectionError>>,
{
    let store = connect().await?;
    log::info!("Connected to {}", store.connection_target());

    let context = RunnerContext::new(store, shutdown_handle.clone());
    if let Some(duration) = options.duration {
        context.stop_after(duration);
    }
    if !options.no_progress {
        let plan = match (options.duration, definition.planned_invocations()) {
            (Some(duration), _) => ProgressPlan::Duration(duration),
            (None, Some(total)) => ProgressPlan::Invocations(total),
            (None, None) => ProgressPlan::Open,
        };
        start_progress(plan, context.completed_counter(), shutdown_handle.new_listener());
    }

    let report = run_scenario(&context, definition).await;

    // Stops the progress display and the duration timer.
    shutdown_handle.shutdown();

    report
}
