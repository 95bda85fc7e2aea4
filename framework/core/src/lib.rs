mod action;
mod error;
mod shutdown;

pub mod prelude {
    pub use crate::action::{ActionKind, UnsupportedActionError};
    pub use crate::error::OperationError;
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle, ShutdownSignalError};
}
