use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mongoperf_core::prelude::ShutdownHandle;
use tokio::task::JoinHandle;

use crate::store::DynStore;

/// Everything a scenario run needs from its surroundings.
#[derive(Debug, Clone)]
pub struct RunnerContext {
    store: DynStore,
    shutdown_handle: ShutdownHandle,
    completed: Arc<AtomicU64>,
}

impl RunnerContext {
    pub fn new(store: DynStore, shutdown_handle: ShutdownHandle) -> Self {
        Self {
            store,
            shutdown_handle,
            completed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    pub fn shutdown_handle(&self) -> &ShutdownHandle {
        &self.shutdown_handle
    }

    /// Stop dispatching new work. Work that is already queued is still executed and reported.
    pub fn force_stop_scenario(&self) {
        if self.shutdown_handle.shutdown() {
            log::info!("Scenario stop requested");
        }
    }

    /// Fire the shutdown signal once `duration` has elapsed. Must be called within a tokio runtime.
    pub fn stop_after(&self, duration: Duration) -> JoinHandle<()> {
        let shutdown_handle = self.shutdown_handle.clone();
        let mut shutdown_listener = shutdown_handle.new_listener();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    if shutdown_handle.shutdown() {
                        log::info!("Configured duration of {:?} elapsed, stopping", duration);
                    }
                }
                _ = shutdown_listener.wait_for_shutdown() => {}
            }
        })
    }

    /// The number of outcomes recorded so far in the current run.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub(crate) fn completed_counter(&self) -> Arc<AtomicU64> {
        self.completed.clone()
    }
}
