use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch::{self, Receiver, Sender};

/// The cancellation context for a scenario run.
///
/// One handle is created per run and cloned freely. Every component that has to react to
/// cancellation holds a [DelegatedShutdownListener] obtained from [ShutdownHandle::new_listener].
/// The signal is state based, so a listener created after the handle fired still observes it.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Arc<Sender<bool>>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: Arc::new(watch::channel(false).0),
        }
    }

    /// Fire the shutdown signal.
    ///
    /// Firing is idempotent. Returns `true` only for the call that actually changed the state.
    pub fn shutdown(&self) -> bool {
        let fired = self.sender.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        });

        if fired {
            log::debug!("Shutdown signal fired");
        }

        fired
    }

    /// Point in time check of whether the signal has fired.
    pub fn is_shutdown(&self) -> bool {
        *self.sender.borrow()
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Receiver<bool>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<bool>) -> Self {
        Self { receiver }
    }

    /// Point in time check if the shutdown signal has been received. If this returns true then work
    /// should be stopped so that the scenario can shut down.
    pub fn should_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Wait for the shutdown signal to be received. It is safe to race this with another future so
    /// that the shutdown signal can be used to cancel other work in progress.
    ///
    /// If every [ShutdownHandle] is dropped without firing then nothing can cancel the run any more
    /// and this future never resolves.
    pub async fn wait_for_shutdown(&mut self) {
        if self.receiver.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` to completion unless the shutdown signal fires while it is in flight.
    ///
    /// Work that starts after the signal has already fired is run to completion, so that items which
    /// were queued before cancellation are still executed.
    pub async fn run_cancellable<T>(
        &self,
        fut: impl Future<Output = T>,
    ) -> Result<T, ShutdownSignalError> {
        if self.should_shutdown() {
            return Ok(fut.await);
        }

        let mut listener = self.clone();
        tokio::select! {
            biased;
            result = fut => Ok(result),
            _ = listener.wait_for_shutdown() => Err(ShutdownSignalError::default()),
        }
    }
}

/// Marker error for work that was abandoned because the shutdown signal fired.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}
