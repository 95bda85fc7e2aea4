use std::sync::Arc;

use mongoperf_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use mongoperf_instruments::prelude::OperationOutcome;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::operation::Operation;
use crate::store::DynCollection;

/// Start `count` workers that share the work queue.
///
/// Workers exit once the queue is closed and drained. The result queue closes when the last worker
/// exits.
pub(crate) fn spawn_workers(
    count: usize,
    queue: Receiver<Arc<Operation>>,
    results: Sender<OperationOutcome>,
    collection: DynCollection,
    shutdown_handle: &ShutdownHandle,
) -> Vec<JoinHandle<u64>> {
    let queue = Arc::new(Mutex::new(queue));

    (0..count)
        .map(|worker_index| {
            tokio::spawn(work(
                worker_index,
                queue.clone(),
                results.clone(),
                collection.clone(),
                shutdown_handle.new_listener(),
            ))
        })
        .collect()
}

async fn work(
    worker_index: usize,
    queue: Arc<Mutex<Receiver<Arc<Operation>>>>,
    results: Sender<OperationOutcome>,
    collection: DynCollection,
    shutdown_listener: DelegatedShutdownListener,
) -> u64 {
    let mut processed = 0;

    loop {
        let next = queue.lock().await.recv().await;
        let Some(operation) = next else {
            break;
        };

        let outcome = operation
            .execute(collection.as_ref(), &shutdown_listener)
            .await;
        if let Some(e) = outcome.error() {
            log::debug!("Operation {} failed: {}", operation.name(), e);
        }

        if results.send(outcome).await.is_err() {
            log::error!("Result queue closed, stopping worker-{}", worker_index);
            break;
        }
        processed += 1;
    }

    log::trace!("worker-{} exiting after {} operations", worker_index, processed);

    processed
}
