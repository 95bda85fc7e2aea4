mod cli;
mod context;
mod definition;
mod dispatcher;
mod error;
mod init;
mod loader;
mod operation;
mod progress;
mod run;
mod shutdown;
mod store;
mod summary;
mod types;
mod worker;

pub mod prelude {
    pub use crate::cli::MongoperfCli;
    pub use crate::context::RunnerContext;
    pub use crate::definition::{OperationDefinition, Params, RepeatPolicy, ScenarioDefinition};
    pub use crate::error::{ConfigError, ConnectionError, RunError};
    pub use crate::init::init;
    pub use crate::loader::{load_scenario_file, parse_scenario};
    pub use crate::operation::{Operation, OperationKind};
    pub use crate::run::{run, run_scenario, RunOptions};
    pub use crate::store::{
        Collection, Document, DynCollection, DynStore, FindOneOptions, FindOptions, InMemoryStore,
        Store, UpdateOptions,
    };
    pub use crate::summary::summarize_run;
    pub use crate::types::MongoperfResult;

    pub use mongoperf_core::prelude::*;
    pub use mongoperf_instruments::prelude::*;
}
