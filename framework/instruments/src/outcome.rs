use std::sync::Arc;
use std::time::{Duration, Instant};

use mongoperf_core::prelude::{ActionKind, OperationError};

/// An operation invocation that is in flight.
///
/// Create one immediately before calling the store and turn it into an [OperationOutcome] with
/// [OperationRecord::finish] as soon as the call returns.
#[derive(Debug)]
pub struct OperationRecord {
    operation_name: Arc<str>,
    action: ActionKind,
    started: Instant,
}

impl OperationRecord {
    pub fn new(operation_name: Arc<str>, action: ActionKind) -> Self {
        Self {
            operation_name,
            action,
            started: Instant::now(),
        }
    }

    pub fn finish(self, result: Result<u64, OperationError>) -> OperationOutcome {
        let ended = Instant::now();
        let (change_count, error) = match result {
            Ok(change_count) => (change_count, None),
            Err(e) => (0, Some(e)),
        };

        OperationOutcome {
            operation_name: self.operation_name,
            action: self.action,
            started: self.started,
            ended,
            change_count,
            error,
        }
    }
}

/// The timed result of one operation invocation.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    operation_name: Arc<str>,
    action: ActionKind,
    started: Instant,
    ended: Instant,
    change_count: u64,
    error: Option<OperationError>,
}

impl OperationOutcome {
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    pub(crate) fn shared_name(&self) -> &Arc<str> {
        &self.operation_name
    }

    pub fn action(&self) -> ActionKind {
        self.action
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn ended(&self) -> Instant {
        self.ended
    }

    /// Time spent in the store call. Never negative.
    pub fn duration(&self) -> Duration {
        self.ended.saturating_duration_since(self.started)
    }

    /// Documents created, updated or returned. Always zero for a failed invocation.
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    pub fn error(&self) -> Option<&OperationError> {
        self.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
