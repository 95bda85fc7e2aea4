use crate::shutdown::ShutdownSignalError;

/// Failure of a single operation invocation against the store.
///
/// These are never fatal to a scenario. They are recorded on the outcome of the invocation and
/// folded into the statistics for the operation. The type is `Clone` so that the most recent error
/// can be kept alongside the statistics.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// A single-document read matched nothing.
    #[error("no document matched the filter")]
    NotFound,
    /// The store rejected the request, for example a duplicate key or an invalid update document.
    #[error("request rejected by the store: {0}")]
    Rejected(String),
    /// The request could not be encoded for the store.
    #[error("failed to encode request: {0}")]
    Encoding(String),
    /// The store aborted the call because the run was cancelled.
    #[error(transparent)]
    Cancelled(#[from] ShutdownSignalError),
    /// Any other driver or transport failure.
    #[error("store error: {0}")]
    Driver(String),
}

impl OperationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationError::Cancelled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_error_uses_shutdown_message() {
        let err = OperationError::from(ShutdownSignalError::default());
        assert!(err.is_cancelled());
        assert_eq!("Execution cancelled by shutdown signal", err.to_string());
    }

    #[test]
    fn not_found_is_not_cancelled() {
        assert!(!OperationError::NotFound.is_cancelled());
    }
}
