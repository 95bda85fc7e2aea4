use mongodb::error::{Error, ErrorKind};
use mongoperf_core::prelude::OperationError;

/// Classify a driver error for the operation outcome.
///
/// Errors where the server refused the request are distinguished from transport and other driver
/// failures, so that the report shows which requests were invalid rather than failed.
pub(crate) fn handle_driver_err(err: Error) -> OperationError {
    match *err.kind {
        ErrorKind::Write(_) | ErrorKind::InsertMany(_) | ErrorKind::Command(_) => {
            OperationError::Rejected(err.to_string())
        }
        ErrorKind::BsonSerialization(_) | ErrorKind::InvalidArgument { .. } => {
            OperationError::Encoding(err.to_string())
        }
        _ => OperationError::Driver(err.to_string()),
    }
}
