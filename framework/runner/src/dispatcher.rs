use std::sync::Arc;

use mongoperf_core::prelude::{DelegatedShutdownListener, ShutdownHandle};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use crate::definition::RepeatPolicy;
use crate::operation::Operation;

/// How a feeder finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Feed {
    pub emitted: u64,
    /// Set when the feeder stopped before emitting every planned repeat.
    pub cut_short: bool,
}

/// The producer side of the pipeline, one feeder task per operation.
///
/// Each feeder owns a clone of the queue sender. The queue closes when the last feeder finishes,
/// after the workers have received everything that was buffered.
pub(crate) struct Dispatcher {
    feeders: Vec<(Arc<Operation>, JoinHandle<Feed>)>,
}

impl Dispatcher {
    pub(crate) fn start(
        operations: Vec<(Arc<Operation>, RepeatPolicy)>,
        queue: Sender<Arc<Operation>>,
        shutdown_handle: &ShutdownHandle,
    ) -> Self {
        let feeders = operations
            .into_iter()
            .map(|(operation, repeat)| {
                let handle = tokio::spawn(feed(
                    operation.clone(),
                    repeat,
                    queue.clone(),
                    shutdown_handle.new_listener(),
                ));
                (operation, handle)
            })
            .collect();

        // Only the feeders hold senders from here on.
        drop(queue);

        Self { feeders }
    }

    /// Wait for every feeder. Returns whether any of them was stopped by cancellation.
    pub(crate) async fn join(self) -> Result<bool, tokio::task::JoinError> {
        let mut cut_short = false;
        for (operation, handle) in self.feeders {
            let feed = handle.await?;
            log::debug!(
                "Dispatched {} invocations of {}{}",
                feed.emitted,
                operation.name(),
                if feed.cut_short { " before cancellation" } else { "" }
            );
            cut_short |= feed.cut_short;
        }

        Ok(cut_short)
    }
}

async fn feed(
    operation: Arc<Operation>,
    repeat: RepeatPolicy,
    queue: Sender<Arc<Operation>>,
    mut shutdown_listener: DelegatedShutdownListener,
) -> Feed {
    let planned = repeat.times();
    let mut emitted = 0;

    loop {
        if planned.is_some_and(|planned| emitted >= planned) {
            return Feed {
                emitted,
                cut_short: false,
            };
        }

        if shutdown_listener.should_shutdown() {
            break;
        }

        tokio::select! {
            biased;

            _ = shutdown_listener.wait_for_shutdown() => break,
            sent = queue.send(operation.clone()) => {
                if sent.is_err() {
                    log::warn!("Work queue closed while dispatching {}", operation.name());
                    break;
                }
                emitted += 1;
            }
        }
    }

    Feed {
        emitted,
        cut_short: true,
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::definition::OperationDefinition;

    use super::*;

    fn operation(name: &str) -> Arc<Operation> {
        Arc::new(
            Operation::from_definition(
                &OperationDefinition::new(name, "Find").with_param("Filter", json!({})),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn finite_feeders_emit_exactly_their_repeats() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ShutdownHandle::new();
        let dispatcher = Dispatcher::start(
            vec![
                (operation("a"), RepeatPolicy::Times(NonZeroU64::new(5).unwrap())),
                (operation("b"), RepeatPolicy::Times(NonZeroU64::new(2).unwrap())),
            ],
            tx,
            &handle,
        );

        let mut received = Vec::new();
        while let Some(operation) = rx.recv().await {
            received.push(operation.name().to_string());
        }

        assert!(!dispatcher.join().await.unwrap());
        assert_eq!(5, received.iter().filter(|n| *n == "a").count());
        assert_eq!(2, received.iter().filter(|n| *n == "b").count());
    }

    #[tokio::test]
    async fn infinite_feeder_stops_within_queue_capacity_of_shutdown() {
        let capacity = 3;
        let (tx, mut rx) = mpsc::channel(capacity);
        let handle = ShutdownHandle::new();
        let dispatcher = Dispatcher::start(vec![(operation("a"), RepeatPolicy::Forever)], tx, &handle);

        for _ in 0..10 {
            rx.recv().await.unwrap();
        }
        handle.shutdown();

        // The feeder is blocked on a full queue or about to check the signal, either way it may
        // only have buffered up to the queue capacity.
        tokio::time::timeout(Duration::from_secs(5), async {
            let mut after = 0;
            while rx.recv().await.is_some() {
                after += 1;
            }
            assert!(after <= capacity + 1, "received {} items after shutdown", after);
        })
        .await
        .unwrap();

        assert!(dispatcher.join().await.unwrap());
    }

    #[tokio::test]
    async fn nothing_is_dispatched_after_shutdown_fired() {
        let (tx, mut rx) = mpsc::channel(8);
        let handle = ShutdownHandle::new();
        handle.shutdown();

        let dispatcher = Dispatcher::start(
            vec![(operation("a"), RepeatPolicy::Times(NonZeroU64::new(5).unwrap()))],
            tx,
            &handle,
        );

        assert!(rx.recv().await.is_none());
        assert!(dispatcher.join().await.unwrap());
    }
}
